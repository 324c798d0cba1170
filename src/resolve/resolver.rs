use crate::github::{CommitLister, CommitSummary, GitHubApi, PageProgress};
use crate::model::{Repository, Result};
use crate::resolve::{DropSummary, PullRecord, Resolution};
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use indicatif::ProgressBar;
use itertools::{Either, Itertools};
use log::{debug, info, warn};
use regex::Regex;
use std::sync::LazyLock;

static PULL_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([0-9]+)").expect("valid pull reference pattern"));

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Maximum number of per-commit lookups in flight.
    pub concurrency: usize,
    pub max_pages: u32,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            concurrency: 16,
            max_pages: 100,
        }
    }
}

/// First `#<digits>` in a commit message.
pub fn pull_reference(message: &str) -> Option<u64> {
    PULL_REFERENCE
        .captures(message)
        .and_then(|captures| captures[1].parse().ok())
}

/// Lists commits since `since` and maps each one to the pull request its
/// message references. Commits without a reference, or whose lookups fail,
/// are left out.
pub async fn resolve<'a, C: GitHubApi>(
    client: &C,
    repository: &Repository,
    since: &DateTime<Utc>,
    options: &ResolveOptions,
    page_cb: PageProgress<'a>,
    pb: &ProgressBar,
) -> Result<Vec<PullRecord>> {
    let commits = repository
        .fetch_commits(client, since, options.max_pages, page_cb)
        .await?;
    info!("{repository}: {} commits since {since}", commits.len());

    pb.set_length(commits.len() as u64);
    let resolutions = resolve_all(client, repository, commits, options.concurrency, pb).await;
    let (records, dropped) = collect_records(resolutions);
    info!(
        "{repository}: resolved {} pull requests, dropped {} commits ({} without reference, {} failed)",
        records.len(),
        dropped.total(),
        dropped.unreferenced,
        dropped.failed,
    );
    Ok(records)
}

/// Resolves every commit with at most `concurrency` lookups in flight.
/// Results come back in listing order.
pub async fn resolve_all<C: GitHubApi>(
    client: &C,
    repository: &Repository,
    commits: Vec<CommitSummary>,
    concurrency: usize,
    pb: &ProgressBar,
) -> Vec<Resolution> {
    stream::iter(commits)
        .map(|commit| async move {
            let resolution = resolve_commit(client, repository, &commit.sha).await;
            pb.inc(1);
            resolution
        })
        .buffered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await
}

pub async fn resolve_commit<C: GitHubApi>(
    client: &C,
    repository: &Repository,
    sha: &str,
) -> Resolution {
    let detail = match client.get_commit(repository, sha).await {
        Ok(detail) => detail,
        Err(error) => {
            return Resolution::Failed {
                sha: sha.to_string(),
                number: None,
                error,
            }
        }
    };

    let Some(number) = pull_reference(detail.message()) else {
        return Resolution::Unreferenced {
            sha: detail.sha.clone(),
        };
    };

    match client.get_pull_request(repository, number).await {
        Ok(pull) => Resolution::Resolved(PullRecord::new(&detail.sha, detail.lines_changed(), pull)),
        Err(error) => Resolution::Failed {
            sha: detail.sha.clone(),
            number: Some(number),
            error,
        },
    }
}

/// Keeps resolved records in order and tallies what was dropped.
pub fn collect_records(resolutions: Vec<Resolution>) -> (Vec<PullRecord>, DropSummary) {
    let (records, dropped): (Vec<_>, Vec<_>) =
        resolutions.into_iter().partition_map(|resolution| match resolution {
            Resolution::Resolved(record) => Either::Left(record),
            other => Either::Right(other),
        });

    let mut summary = DropSummary::default();
    for resolution in dropped {
        match resolution {
            Resolution::Unreferenced { sha } => {
                debug!("{sha}: no pull request reference");
                summary.unreferenced += 1;
            }
            Resolution::Failed { sha, number, error } => {
                match number {
                    Some(number) => warn!("{sha}: dropped, pull request #{number}: {error}"),
                    None => warn!("{sha}: dropped, commit lookup: {error}"),
                }
                summary.failed += 1;
            }
            Resolution::Resolved(_) => {}
        }
    }
    (records, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::mock::MockGitHub;

    fn since() -> DateTime<Utc> {
        "2024-01-01T00:00:00Z".parse().unwrap()
    }

    async fn run(mock: &MockGitHub) -> Result<Vec<PullRecord>> {
        resolve(
            mock,
            &Repository::new("o", "r"),
            &since(),
            &ResolveOptions::default(),
            Box::new(|_: u32| {}),
            &ProgressBar::hidden(),
        )
        .await
    }

    #[test]
    fn first_reference_wins() {
        assert_eq!(pull_reference("fix bug #42"), Some(42));
        assert_eq!(pull_reference("Revert \"x (#12)\" (#13)"), Some(12));
        assert_eq!(pull_reference("cleanup"), None);
        assert_eq!(pull_reference("issue # 5"), None);
        assert_eq!(pull_reference("#99999999999999999999999"), None);
        assert_eq!(pull_reference("port ٤٢ #٤٢ then (#42)"), Some(42));
    }

    #[tokio::test]
    async fn only_commits_with_a_reference_produce_records() {
        let mock = MockGitHub::new()
            .with_commit("a", "fix bug #42", 12)
            .with_commit("b", "cleanup", 3)
            .with_pull(42, "2024-01-01T00:00:00Z", Some("2024-01-04T00:00:00Z"), Some("dev"));

        let records = run(&mock).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sha, "a");
        assert_eq!(records[0].number, "42");
        assert_eq!(records[0].lines_changed, 12);
        assert_eq!(records[0].duration_days, Some(3));
        assert_eq!(records[0].author_login.as_deref(), Some("dev"));
    }

    #[tokio::test]
    async fn failed_pull_lookup_is_dropped_without_error() {
        let mock = MockGitHub::new()
            .with_commit("a", "one (#1)", 1)
            .with_commit("b", "two (#2)", 2)
            .with_commit("c", "three (#3)", 3)
            .with_pull(1, "2024-01-01T00:00:00Z", None, None)
            .with_pull(3, "2024-01-01T00:00:00Z", None, None);

        let records = run(&mock).await.unwrap();

        let shas: Vec<_> = records.iter().map(|r| r.sha.as_str()).collect();
        assert_eq!(shas, vec!["a", "c"]);
        assert!(records.iter().all(|r| r.duration_days.is_none()));
    }

    #[tokio::test]
    async fn records_follow_listing_order() {
        // Earlier commits answer later, so completion order is the reverse
        // of listing order within every window.
        let mut mock = MockGitHub::new();
        for i in 0..40u64 {
            let sha = format!("sha{i}");
            mock = mock
                .with_commit(&sha, &format!("change (#{i})"), i)
                .with_pull(i, "2024-01-01T00:00:00Z", Some("2024-01-02T00:00:00Z"), None)
                .with_commit_delay(&sha, 40 - i as usize);
        }
        let options = ResolveOptions {
            concurrency: 4,
            ..ResolveOptions::default()
        };

        let records = resolve(
            &mock,
            &Repository::new("o", "r"),
            &since(),
            &options,
            Box::new(|_: u32| {}),
            &ProgressBar::hidden(),
        )
        .await
        .unwrap();

        let numbers: Vec<_> = records.iter().map(|r| r.number.clone()).collect();
        let expected: Vec<_> = (0..40).map(|i: u64| i.to_string()).collect();
        assert_eq!(numbers, expected);
    }

    #[tokio::test]
    async fn listing_failure_propagates() {
        let mock = MockGitHub::new().failing_listing();
        assert!(run(&mock).await.is_err());
    }

    #[tokio::test]
    async fn missing_commit_detail_counts_as_failure() {
        let mock = MockGitHub::new();
        let repo = Repository::new("o", "r");
        let commits = vec![MockGitHub::summary("ghost", "x #1")];

        let resolutions = resolve_all(&mock, &repo, commits, 2, &ProgressBar::hidden()).await;
        let (records, dropped) = collect_records(resolutions);

        assert!(records.is_empty());
        assert_eq!(dropped, DropSummary { unreferenced: 0, failed: 1 });
    }

    #[tokio::test]
    async fn drop_summary_separates_unreferenced_from_failed() {
        let mock = MockGitHub::new()
            .with_commit("a", "docs", 1)
            .with_commit("b", "fix (#7)", 1)
            .with_commit("c", "tweak", 1);
        let repo = Repository::new("o", "r");
        let commits = vec![
            MockGitHub::summary("a", ""),
            MockGitHub::summary("b", ""),
            MockGitHub::summary("c", ""),
        ];

        let resolutions = resolve_all(&mock, &repo, commits, 8, &ProgressBar::hidden()).await;
        assert!(matches!(resolutions[1], Resolution::Failed { number: Some(7), .. }));

        let (records, dropped) = collect_records(resolutions);
        assert!(records.is_empty());
        assert_eq!(dropped, DropSummary { unreferenced: 2, failed: 1 });
        assert_eq!(dropped.total(), 3);
    }
}
