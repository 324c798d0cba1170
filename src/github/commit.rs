use crate::github::GitHubApi;
use crate::model::{Error, Repository, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const PER_PAGE: usize = 100;

/// One entry of a commit listing page.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    #[serde(default)]
    pub html_url: String,
    pub commit: CommitPayload,
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitPayload {
    pub message: String,
}

/// The GitHub account linked to a commit, absent for unlinked emails.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    pub login: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitStats {
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub sha: String,
    pub commit: CommitPayload,
    pub stats: CommitStats,
}

impl CommitDetail {
    pub fn message(&self) -> &str {
        &self.commit.message
    }

    /// Additions plus deletions.
    pub fn lines_changed(&self) -> u64 {
        self.stats.total
    }
}

pub type PageProgress<'a> = Box<dyn FnMut(u32) + 'a>;

pub trait CommitLister {
    async fn fetch_commits<'a, C: GitHubApi>(
        &self,
        client: &C,
        since: &DateTime<Utc>,
        max_pages: u32,
        cb: PageProgress<'a>,
    ) -> Result<Vec<CommitSummary>>;
}

impl CommitLister for Repository {
    /// Walks the listing newest-first until a short page comes back.
    async fn fetch_commits<'a, C: GitHubApi>(
        &self,
        client: &C,
        since: &DateTime<Utc>,
        max_pages: u32,
        mut cb: PageProgress<'a>,
    ) -> Result<Vec<CommitSummary>> {
        let mut commits: Vec<CommitSummary> = vec![];
        for page in 1..=max_pages {
            cb(page);
            let fetched = client.list_commits(self, since, page).await?;
            let is_last_page = fetched.len() < PER_PAGE;
            commits.extend(fetched);
            if is_last_page {
                return Ok(commits);
            }
        }
        Err(Error::PageLimitExceeded {
            repository: self.to_string(),
            max_pages,
        })
    }
}
