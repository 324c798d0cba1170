mod github;
mod model;
mod pypi;
mod registry;
mod resolve;
mod utils;

use crate::github::client::DEFAULT_API_URL;
use crate::github::{CommitLister, GitHubClient, PageProgress};
use crate::model::{Error, Repository, Result, Target};
use crate::resolve::{CommitRecord, ResolveOptions};
use crate::utils::{MultiProgressNew, ProgressStyleTemplate};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar};
use log::error;
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration as StdDuration;

/// Prints JSON snapshots of repository activity for the docs dashboard.
#[derive(Parser, Debug, Clone)]
#[command(name = "dashboard-data")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Commits since the window start, resolved to the pull requests they reference
    Pulls {
        #[command(flatten)]
        window: Window,
        /// Per-commit lookups allowed in flight at once
        #[arg(long, default_value_t = 16)]
        concurrency: usize,
    },
    /// Commits since the window start, without pull request lookups
    Commits {
        #[command(flatten)]
        window: Window,
    },
    /// Daily downloads from a GitHub container package page
    RegistryDownloads {
        #[arg(long, default_value = registry::DEFAULT_PACKAGE_URL)]
        url: String,
    },
    /// Daily PyPI downloads per version, from the public BigQuery dataset
    PypiDownloads {
        #[arg(long, default_value = "vllm")]
        package: String,
        #[arg(long, default_value_t = 60)]
        days: u32,
        /// Google Cloud project billed for the query
        #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
        gcp_project: String,
        /// OAuth access token, e.g. from `gcloud auth print-access-token`
        #[arg(long, env = "BIGQUERY_ACCESS_TOKEN", hide_env_values = true)]
        bigquery_token: String,
        #[arg(long, default_value = "US")]
        location: String,
        #[arg(long, default_value = pypi::DEFAULT_API_URL)]
        bigquery_url: String,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct Window {
    /// Named target from the targets file
    #[arg(long, conflicts_with_all = ["owner", "repo"])]
    target: Option<String>,
    #[arg(long = "targets", default_value = "targets.json")]
    targets_path: String,
    #[arg(long, requires = "repo")]
    owner: Option<String>,
    #[arg(long, requires = "owner")]
    repo: Option<String>,
    /// Look back this many days (defaults to the target's window)
    #[arg(long, conflicts_with = "since")]
    days: Option<u32>,
    /// Window start, YYYY-MM-DD or RFC 3339
    #[arg(long)]
    since: Option<String>,
    #[arg(long, default_value_t = 100)]
    max_pages: u32,
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: String,
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(err) = run(&args).await {
        error!("{err}");
        std::process::exit(1);
    }
}

async fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Pulls {
            window,
            concurrency,
        } => {
            let (repository, since) = window.resolve(14)?;
            let client = window.client()?;
            let options = ResolveOptions {
                concurrency: *concurrency,
                max_pages: window.max_pages,
            };

            let multi_progress = MultiProgress::default();
            let (pages_pb, page_cb) = page_progress(&multi_progress, &repository);
            let commits_pb = multi_progress.add_with_style(
                ProgressBar::no_length(),
                ProgressStyleTemplate::number_bar(),
            );
            commits_pb.set_message("Resolving");

            let records =
                resolve::resolve(&client, &repository, &since, &options, page_cb, &commits_pb)
                    .await?;
            pages_pb.finish_and_clear();
            commits_pb.finish_with_message(format!(
                "✅ Resolved {} pull requests",
                records.len()
            ));
            print_json(&records)
        }
        Command::Commits { window } => {
            let (repository, since) = window.resolve(30)?;
            let client = window.client()?;

            let multi_progress = MultiProgress::default();
            let (pages_pb, page_cb) = page_progress(&multi_progress, &repository);
            let commits = repository
                .fetch_commits(&client, &since, window.max_pages, page_cb)
                .await?;
            pages_pb.finish_with_message(format!(
                "✅ Completed fetch commits (find {} commits)",
                commits.len()
            ));

            let records = commits
                .into_iter()
                .map(CommitRecord::from)
                .collect::<Vec<_>>();
            print_json(&records)
        }
        Command::RegistryDownloads { url } => {
            let downloads = registry::fetch_downloads(url).await?;
            print_json(&downloads)
        }
        Command::PypiDownloads {
            package,
            days,
            gcp_project,
            bigquery_token,
            location,
            bigquery_url,
        } => {
            let client = pypi::BigQueryClient::new(bigquery_url, gcp_project, bigquery_token);
            let rows = client.fetch_downloads(package, *days, location).await?;
            print_json(&rows)
        }
    }
}

impl Window {
    /// Repository and window start, from `--target` or `--owner/--repo`.
    fn resolve(&self, default_days: u32) -> Result<(Repository, DateTime<Utc>)> {
        let (repository, target_days) = match (&self.target, &self.owner, &self.repo) {
            (Some(name), _, _) => {
                let targets = Target::from_config(&self.targets_path)?;
                let target = Target::find(&targets, name)?;
                (target.repository.clone(), Some(target.days))
            }
            (None, Some(owner), Some(repo)) => (Repository::new(owner, repo), None),
            _ => {
                return Err(Error::Config(
                    "pass either --target or both --owner and --repo".to_string(),
                ))
            }
        };

        let since = match &self.since {
            Some(since) => parse_since(since)?,
            None => {
                let days = self.days.or(target_days).unwrap_or(default_days);
                TimeDelta::try_days(days.into())
                    .and_then(|window| Utc::now().checked_sub_signed(window))
                    .ok_or_else(|| Error::Config(format!("a {days}-day window is out of range")))?
            }
        };
        Ok((repository, since))
    }

    fn client(&self) -> Result<GitHubClient> {
        GitHubClient::new(
            &self.api_url,
            &self.github_token,
            self.timeout_secs.map(StdDuration::from_secs),
        )
    }
}

fn parse_since(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc())
        .ok_or_else(|| Error::InvalidDate(value.to_string()))
}

fn page_progress<'a>(
    multi_progress: &MultiProgress,
    repository: &Repository,
) -> (ProgressBar, PageProgress<'a>) {
    let pb = multi_progress.add_with_style(
        ProgressBar::new_spinner(),
        ProgressStyleTemplate::only_message(),
    );
    let progress_pb = pb.clone();
    let repository = repository.to_string();
    let progress = move |page: u32| {
        progress_pb.set_message(format!("Fetch {repository} commits (#{page} page) ..."));
    };
    (pb, Box::new(progress))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    write_json(io::stdout().lock(), value)
}

fn write_json<W: Write, T: Serialize>(mut out: W, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    writeln!(out, "{json}")
        .and_then(|()| out.flush())
        .map_err(|source| Error::Io {
            path: "<stdout>".to_string(),
            source,
        })
}
