//! Daily download counts scraped from a GitHub container package page.
//!
//! The package page renders its "last 30 days" chart as inline SVG, one
//! `<rect>` per day carrying `data-date` and `data-merge-count` attributes.
//! There is no API for these numbers, so the page markup is the source.

use crate::model::{Error, Result};
use log::info;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

pub const DEFAULT_PACKAGE_URL: &str =
    "https://github.com/huggingface/text-generation-inference/pkgs/container/text-generation-inference";

const CHART_LABEL: &str = r#"aria-label="Downloads for the last 30 days""#;

static RECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<rect\b[^>]*>").expect("valid rect pattern"));
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bdata-date="([^"]*)""#).expect("valid date pattern"));
static MERGE_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bdata-merge-count="([^"]*)""#).expect("valid merge count pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyDownloads {
    pub date: Option<String>,
    #[serde(rename = "mergeCount")]
    pub merge_count: Option<String>,
}

pub async fn fetch_downloads(url: &str) -> Result<Vec<DailyDownloads>> {
    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Status {
            status,
            url: url.to_string(),
            body,
        });
    }
    let page = response.text().await?;
    let downloads = parse_downloads(&page);
    info!("{url}: {} days of downloads", downloads.len());
    Ok(downloads)
}

/// Reads the bars of the downloads chart, in document order. A page
/// without the chart gives an empty list.
pub fn parse_downloads(page: &str) -> Vec<DailyDownloads> {
    let Some(chart) = chart_svg(page) else {
        return vec![];
    };
    RECT.find_iter(chart)
        .map(|rect| DailyDownloads {
            date: attribute(&DATE, rect.as_str()),
            merge_count: attribute(&MERGE_COUNT, rect.as_str()),
        })
        .collect()
}

fn chart_svg(page: &str) -> Option<&str> {
    let labelled = &page[page.find(CHART_LABEL)?..];
    let svg = &labelled[labelled.find("<svg")?..];
    let end = svg.find("</svg>").unwrap_or(svg.len());
    Some(&svg[..end])
}

fn attribute(pattern: &Regex, tag: &str) -> Option<String> {
    pattern
        .captures(tag)
        .map(|captures| captures[1].to_string())
}
