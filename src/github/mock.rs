//! In-memory stand-in for the GitHub REST API.

use crate::github::commit::{CommitPayload, CommitStats};
use crate::github::pull_request::PullRequestUser;
use crate::github::{CommitDetail, CommitSummary, GitHubApi, PullRequest};
use crate::model::{Error, Repository, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MockGitHub {
    pages: Vec<Vec<CommitSummary>>,
    details: HashMap<String, CommitDetail>,
    pulls: HashMap<u64, PullRequest>,
    commit_delays: HashMap<String, usize>,
    fail_listing: bool,
    listing_requests: Mutex<Vec<u32>>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(mut self, pages: Vec<Vec<CommitSummary>>) -> Self {
        self.pages = pages;
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// Adds a commit to the first listing page along with its detail.
    pub fn with_commit(mut self, sha: &str, message: &str, lines: u64) -> Self {
        if self.pages.is_empty() {
            self.pages.push(vec![]);
        }
        self.pages[0].push(Self::summary(sha, message));
        self.details.insert(
            sha.to_string(),
            CommitDetail {
                sha: sha.to_string(),
                commit: CommitPayload {
                    message: message.to_string(),
                },
                stats: CommitStats { total: lines },
            },
        );
        self
    }

    /// Makes the detail lookup for `sha` yield to the runtime `polls` times
    /// before answering.
    pub fn with_commit_delay(mut self, sha: &str, polls: usize) -> Self {
        self.commit_delays.insert(sha.to_string(), polls);
        self
    }

    pub fn with_pull(
        mut self,
        number: u64,
        created_at: &str,
        merged_at: Option<&str>,
        author: Option<&str>,
    ) -> Self {
        let created_at: DateTime<Utc> = created_at.parse().expect("created_at");
        let merged_at: Option<DateTime<Utc>> = merged_at.map(|m| m.parse().expect("merged_at"));
        self.pulls.insert(
            number,
            PullRequest {
                number,
                title: format!("PR {number}"),
                created_at,
                closed_at: merged_at,
                merged_at,
                user: author.map(|login| PullRequestUser {
                    login: login.to_string(),
                }),
            },
        );
        self
    }

    pub fn summary(sha: &str, message: &str) -> CommitSummary {
        CommitSummary {
            sha: sha.to_string(),
            html_url: format!("https://github.com/o/r/commit/{sha}"),
            commit: CommitPayload {
                message: message.to_string(),
            },
            author: None,
        }
    }

    pub fn listing_requests(&self) -> Vec<u32> {
        self.listing_requests.lock().unwrap().clone()
    }

    fn not_found(url: String) -> Error {
        Error::Status {
            status: StatusCode::NOT_FOUND,
            url,
            body: r#"{"message":"Not Found"}"#.to_string(),
        }
    }
}

impl GitHubApi for MockGitHub {
    async fn list_commits(
        &self,
        _repository: &Repository,
        _since: &DateTime<Utc>,
        page: u32,
    ) -> Result<Vec<CommitSummary>> {
        self.listing_requests.lock().unwrap().push(page);
        if self.fail_listing {
            return Err(Error::Status {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                url: format!("commits?page={page}"),
                body: String::new(),
            });
        }
        Ok(self
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_commit(&self, _repository: &Repository, sha: &str) -> Result<CommitDetail> {
        for _ in 0..self.commit_delays.get(sha).copied().unwrap_or(0) {
            tokio::task::yield_now().await;
        }
        self.details
            .get(sha)
            .cloned()
            .ok_or_else(|| Self::not_found(format!("commits/{sha}")))
    }

    async fn get_pull_request(&self, _repository: &Repository, number: u64) -> Result<PullRequest> {
        self.pulls
            .get(&number)
            .cloned()
            .ok_or_else(|| Self::not_found(format!("pulls/{number}")))
    }
}
