//! In-memory [`PageSource`] for offline tests.

use super::static_page::{FetchedPage, PageSource};
use crate::error::{CrawlError, Result};
use std::collections::HashMap;

/// Serves canned HTML keyed by exact URL. Unknown URLs answer 404.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    pages: HashMap<String, FetchedPage>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`.
    pub fn page(self, url: &str, body: &str) -> Self {
        self.redirect(url, url, body)
    }

    /// Serve `body` at `url` as if the request ended up at `final_url`.
    pub fn redirect(mut self, url: &str, final_url: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchedPage {
                final_url: final_url.to_string(),
                body: body.to_string(),
            },
        );
        self
    }
}

impl PageSource for FixtureSource {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        self.pages.get(url).cloned().ok_or_else(|| CrawlError::Status {
            status: 404,
            url: url.to_string(),
        })
    }
}
