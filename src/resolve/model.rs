use crate::github::{CommitSummary, PullRequest};
use crate::model::Error;
use chrono::{DateTime, Utc};
use serde::Serialize;

const MILLIS_PER_DAY: f64 = 1000.0 * 60.0 * 60.0 * 24.0;

/// One commit resolved to the pull request it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRecord {
    pub sha: String,
    #[serde(rename = "lines")]
    pub lines_changed: u64,
    pub number: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(rename = "author", skip_serializing_if = "Option::is_none")]
    pub author_login: Option<String>,
    /// `None` while the pull request is unmerged.
    #[serde(rename = "durationDays")]
    pub duration_days: Option<i64>,
}

impl PullRecord {
    pub fn new(sha: impl ToString, lines_changed: u64, pull: PullRequest) -> Self {
        let duration_days = duration_days(&pull.created_at, pull.merged_at.as_ref());
        Self {
            sha: sha.to_string(),
            lines_changed,
            number: pull.number.to_string(),
            author_login: pull.author_login().map(String::from),
            title: pull.title,
            created_at: pull.created_at,
            closed_at: pull.closed_at,
            merged_at: pull.merged_at,
            duration_days,
        }
    }
}

/// Whole days from creation to merge, halves rounded up.
pub fn duration_days(created_at: &DateTime<Utc>, merged_at: Option<&DateTime<Utc>>) -> Option<i64> {
    let merged_at = merged_at?;
    let days = (*merged_at - *created_at).num_milliseconds() as f64 / MILLIS_PER_DAY;
    Some((days + 0.5).floor() as i64)
}

/// Flat projection of a listed commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitRecord {
    pub sha: String,
    pub url: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
}

impl From<CommitSummary> for CommitRecord {
    fn from(summary: CommitSummary) -> Self {
        let (author_login, author_avatar) = match summary.author {
            Some(author) => (Some(author.login), Some(author.avatar_url)),
            None => (None, None),
        };
        Self {
            sha: summary.sha,
            url: summary.html_url,
            message: summary.commit.message,
            author_login,
            author_avatar,
        }
    }
}

/// Outcome of resolving a single listed commit.
#[derive(Debug)]
pub enum Resolution {
    Resolved(PullRecord),
    /// The commit message carries no `#<number>` reference.
    Unreferenced { sha: String },
    Failed {
        sha: String,
        number: Option<u64>,
        error: Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropSummary {
    pub unreferenced: usize,
    pub failed: usize,
}

impl DropSummary {
    pub fn total(&self) -> usize {
        self.unreferenced + self.failed
    }
}
