//! Document navigation on top of a [`Browser`].
//!
//! The [`Navigator`] owns one browser session and adds what both crawl stages
//! need from it:
//!
//! - bounded page loads followed by scroll-and-pause cycles for lazy content
//! - entering the canonical post view, following the embedded frame when the
//!   desktop blog shell wraps the post
//! - ordered-fallback queries: a list of locators is tried in priority order
//!   and the first one that yields a usable value wins
//!
//! None of the operations here raise on a missing element or a slow page;
//! they resolve to `false`, an empty string or an empty list, and log why.

use crate::browser::{Browser, Element, Scroll, TextHit};
use crate::config::Timing;
use crate::error::Result;
use crate::scrapers::{MOBILE_POST_HOST, POST_VIEW_MARKER};
use rand::{Rng, rng};
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, instrument, warn};
use url::Url;

pub struct Navigator<B> {
    browser: B,
    timing: Timing,
    frame_locator: String,
}

impl<B: Browser> Navigator<B> {
    pub fn new(browser: B, timing: Timing, frame_locator: &str) -> Self {
        Self {
            browser,
            timing,
            frame_locator: frame_locator.to_string(),
        }
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn current_url(&self) -> Option<&str> {
        self.browser.current_url()
    }

    pub fn page_source(&self) -> Option<&str> {
        self.browser.page_source()
    }

    /// Sleep for a random duration within the configured pause range.
    pub async fn pause(&self) {
        let (min, max) = self.timing.pause_range_ms();
        if max == 0 {
            return;
        }
        let ms = rng().random_range(min..=max);
        sleep(Duration::from_millis(ms)).await;
    }

    /// Load `url` and wait for it to be ready, then run the configured
    /// scroll cycles. Returns `false` on load failure or timeout.
    #[instrument(level = "debug", skip(self))]
    pub async fn navigate(&mut self, url: &str) -> bool {
        let limit = self.timing.page_load();
        match timeout(limit, self.browser.open(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(%url, error = %e, "Navigation failed");
                return false;
            }
            Err(_) => {
                warn!(%url, ?limit, "Navigation timed out");
                return false;
            }
        }

        if !self.wait_until(limit, |b| b.is_ready()).await {
            warn!(%url, ?limit, "Document never became ready");
            return false;
        }

        for _ in 0..self.timing.navigate_scroll_cycles {
            if self.browser.scroll(Scroll::By(0.5)).await.is_err() {
                break;
            }
            self.pause().await;
            if self.browser.scroll(Scroll::Top).await.is_err() {
                break;
            }
        }
        true
    }

    /// Navigate to `url` and make sure the post itself, not the blog shell
    /// around it, is the current document.
    ///
    /// Mobile post pages are canonical as served. Desktop pages embed the post
    /// in a frame; its `src` is resolved against the current location and
    /// loaded. Without a frame, a location that already is a post view counts
    /// as canonical.
    #[instrument(level = "debug", skip(self))]
    pub async fn enter_canonical_view(&mut self, url: &str) -> bool {
        self.navigate(url).await;
        self.pause().await;

        let Some(current) = self.current_url().map(str::to_string) else {
            return false;
        };
        if host_of(&current).is_some_and(|h| h.contains(MOBILE_POST_HOST)) {
            return true;
        }

        let frame = [self.frame_locator.clone()];
        if self.wait_for_any(&frame, self.timing.frame_wait()).await {
            let src = self
                .query_all(&frame)
                .into_iter()
                .find_map(|el| el.attr("src").map(str::trim).map(str::to_string))
                .filter(|s| !s.is_empty());
            if let Some(src) = src {
                match resolve_url(&current, &src) {
                    Ok(target) => {
                        debug!(%target, "Following post frame");
                        let entered = self.navigate(&target).await;
                        self.pause().await;
                        return entered;
                    }
                    Err(e) => warn!(%src, error = %e, "Unusable post frame location"),
                }
            }
        }

        current.contains(POST_VIEW_MARKER)
    }

    /// Scroll down by `fraction` of the page `steps` times, pausing in between.
    pub async fn stimulate(&mut self, steps: usize, fraction: f32) -> Result<()> {
        for _ in 0..steps {
            self.browser.scroll(Scroll::By(fraction)).await?;
            self.pause().await;
        }
        Ok(())
    }

    pub async fn scroll(&mut self, to: Scroll) -> Result<()> {
        self.browser.scroll(to).await
    }

    /// Wait up to `limit` for any of `locators` to match.
    pub async fn wait_for_any(&self, locators: &[String], limit: Duration) -> bool {
        self.wait_until(limit, |b| {
            locators
                .iter()
                .any(|l| b.query(l).is_ok_and(|els| !els.is_empty()))
        })
        .await
    }

    /// Poll `check` until it holds or `limit` passes. A document that cannot
    /// change on its own is checked exactly once.
    pub async fn wait_until(&self, limit: Duration, mut check: impl FnMut(&B) -> bool) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            if check(&self.browser) {
                return true;
            }
            if !self.browser.renders_dynamically() || Instant::now() >= deadline {
                return false;
            }
            sleep(self.timing.poll_interval()).await;
        }
    }

    /// Evaluate `locators` in order, handing each one's matches to `extract`;
    /// the first value produced wins. Failing locators count as misses.
    pub fn first_match<T>(
        &self,
        locators: &[String],
        mut extract: impl FnMut(Vec<Element>) -> Option<T>,
    ) -> Option<T> {
        locators.iter().find_map(|locator| match self.browser.query(locator) {
            Ok(els) => extract(els),
            Err(e) => {
                debug!(%locator, error = %e, "Locator failed");
                None
            }
        })
    }

    /// First non-empty element text under the highest-priority locator that
    /// has one, or `""`.
    pub fn query_first_text(&self, locators: &[String]) -> String {
        self.first_match(locators, |els| {
            els.into_iter().map(|e| e.text).find(|t| !t.is_empty())
        })
        .unwrap_or_default()
    }

    /// Matches of the first locator that matches anything at all.
    pub fn query_all(&self, locators: &[String]) -> Vec<Element> {
        self.first_match(locators, |els| (!els.is_empty()).then_some(els))
            .unwrap_or_default()
    }

    /// Matches of every locator, in locator order.
    pub fn query_union(&self, locators: &[String]) -> Vec<Element> {
        locators
            .iter()
            .filter_map(|l| self.browser.query(l).ok())
            .flatten()
            .collect()
    }

    /// Propagating single-locator query, for steps that must notice faults.
    pub fn query(&self, locator: &str) -> Result<Vec<Element>> {
        self.browser.query(locator)
    }

    pub fn find_text(&self, needle: &str, siblings: usize) -> Vec<TextHit> {
        self.browser.find_text(needle, siblings).unwrap_or_default()
    }

    /// Click the first element of the first locator whose click leads
    /// somewhere. Returns `false` when no control worked.
    pub async fn click_first(&mut self, locators: &[String]) -> bool {
        for locator in locators {
            let Some(el) = self
                .browser
                .query(locator)
                .ok()
                .and_then(|els| els.into_iter().next())
            else {
                continue;
            };
            match self.browser.click(&el).await {
                Ok(true) => return true,
                Ok(false) => continue,
                Err(e) => warn!(%locator, error = %e, "Click failed"),
            }
        }
        false
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

/// Resolve a possibly relative or protocol-relative `src` against `base`.
pub fn resolve_url(base: &str, src: &str) -> Result<String> {
    Ok(Url::parse(base)?.join(src)?.to_string())
}
