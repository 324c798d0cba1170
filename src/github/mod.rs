pub mod client;
pub mod commit;
#[cfg(test)]
pub mod mock;
pub mod pull_request;

pub use client::{GitHubApi, GitHubClient};
pub use commit::{CommitDetail, CommitLister, CommitSummary, PageProgress};
pub use pull_request::PullRequest;
