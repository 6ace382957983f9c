//! Error types shared by the crawler.
//!
//! [`CrawlError`] covers every fault the document layer, the extractors and
//! the output writers can raise. Post extraction never propagates these to
//! the pipeline; instead the fault's [`CrawlError::kind`] label is recorded
//! in the record's status as `error:<kind>`.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, CrawlError>;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("no document is loaded")]
    NoDocument,

    #[error("invalid locator `{0}`")]
    Locator(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("missing column `{0}`")]
    MissingColumn(&'static str),
}

impl CrawlError {
    /// Stable label for the fault, used in `error:<kind>` record statuses.
    pub fn kind(&self) -> &'static str {
        match self {
            CrawlError::Http(e) if e.is_timeout() => "Timeout",
            CrawlError::Http(_) => "HttpError",
            CrawlError::Status { .. } => "HttpStatus",
            CrawlError::Timeout(_) => "Timeout",
            CrawlError::NoDocument => "NoDocument",
            CrawlError::Locator(_) => "InvalidLocator",
            CrawlError::Url(_) => "InvalidUrl",
            CrawlError::Io(_) => "IoError",
            CrawlError::Csv(_) => "CsvError",
            CrawlError::Config(_) => "ConfigError",
            CrawlError::MissingColumn(_) => "MissingColumn",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(CrawlError::NoDocument.kind(), "NoDocument");
        assert_eq!(
            CrawlError::Timeout(Duration::from_secs(3)).kind(),
            "Timeout"
        );
        assert_eq!(
            CrawlError::Status {
                status: 404,
                url: "https://example.com".to_string()
            }
            .kind(),
            "HttpStatus"
        );
        assert_eq!(CrawlError::Locator("a[".to_string()).kind(), "InvalidLocator");
    }

    #[test]
    fn test_display_includes_context() {
        let err = CrawlError::Status {
            status: 503,
            url: "https://blog.naver.com/x".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP status 503 for https://blog.naver.com/x");
        assert_eq!(
            CrawlError::MissingColumn("link").to_string(),
            "missing column `link`"
        );
    }

    #[test]
    fn test_url_error_converts() {
        let err: CrawlError = url::Url::parse("not a url").unwrap_err().into();
        assert_eq!(err.kind(), "InvalidUrl");
    }
}
