use crate::github::commit::PER_PAGE;
use crate::github::{CommitDetail, CommitSummary, PullRequest};
use crate::model::{Error, Repository, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("dashboard-data/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// The three GitHub REST calls the snapshots are built from.
pub trait GitHubApi {
    async fn list_commits(
        &self,
        repository: &Repository,
        since: &DateTime<Utc>,
        page: u32,
    ) -> Result<Vec<CommitSummary>>;

    async fn get_commit(&self, repository: &Repository, sha: &str) -> Result<CommitDetail>;

    async fn get_pull_request(&self, repository: &Repository, number: u64) -> Result<PullRequest>;
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: impl ToString, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.api_url, path);
        debug!("GET {url} {query:?}");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status { status, url, body });
        }
        Ok(response.json().await?)
    }
}

impl GitHubApi for GitHubClient {
    async fn list_commits(
        &self,
        repository: &Repository,
        since: &DateTime<Utc>,
        page: u32,
    ) -> Result<Vec<CommitSummary>> {
        let path = format!("/repos/{}/{}/commits", repository.owner, repository.name);
        self.get(
            &path,
            &[
                ("per_page", PER_PAGE.to_string()),
                ("order", "desc".to_string()),
                ("since", since.to_rfc3339_opts(SecondsFormat::Millis, true)),
                ("page", page.to_string()),
            ],
        )
        .await
    }

    async fn get_commit(&self, repository: &Repository, sha: &str) -> Result<CommitDetail> {
        let path = format!("/repos/{}/{}/commits/{sha}", repository.owner, repository.name);
        self.get(&path, &[]).await
    }

    async fn get_pull_request(&self, repository: &Repository, number: u64) -> Result<PullRequest> {
        let path = format!("/repos/{}/{}/pulls/{number}", repository.owner, repository.name);
        self.get(&path, &[]).await
    }
}
