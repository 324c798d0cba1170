use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub returned {status} for {url}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error on `{path}`: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("BigQuery: {0}")]
    BigQuery(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown target `{name}` (known targets: {known})")]
    UnknownTarget { name: String, known: String },

    #[error("not a valid date: `{0}` (expected YYYY-MM-DD or RFC 3339)")]
    InvalidDate(String),

    #[error("commit listing for {repository} did not end within {max_pages} pages")]
    PageLimitExceeded { repository: String, max_pages: u32 },
}
