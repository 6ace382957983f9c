//! Stage 1: harvest post links from the blog search results of one day.
//!
//! The search is scoped to a single calendar day (`nso=so:dd,p:fromDtoD`).
//! Each results page is scrolled to trigger lazy loading, title anchors are
//! collected with the ordered-fallback title locators, and the "next" control
//! is followed until it disappears or the page cap is hit.
//!
//! Links are de-duplicated by exact URL across all pages of a run.

use super::{POST_HOST, SEARCH_ENDPOINT};
use crate::browser::Browser;
use crate::config::CrawlConfig;
use crate::models::SeedRecord;
use crate::navigator::Navigator;
use crate::utils::{clean_text, truncate_for_log};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Fraction of the page height scrolled per lazy-load step.
const RESULTS_SCROLL_FRACTION: f32 = 0.85;

/// Search URL for `query` restricted to exactly `day`.
///
/// # Examples
///
/// ```ignore
/// let url = build_search_url("성수동 명소", NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
/// assert!(url.ends_with("&nso=so:dd,p:from20250309to20250309"));
/// ```
pub fn build_search_url(query: &str, day: NaiveDate) -> String {
    let d = day.format("%Y%m%d");
    format!(
        "{SEARCH_ENDPOINT}?ssc=tab.blog.all&sm=tab_jum&query={}&nso=so:dd,p:from{d}to{d}",
        urlencoding::encode(query)
    )
}

/// Collect the seeds for `query` on `day`.
///
/// Never fails: a results page that does not load or never shows results
/// yields an empty list. When `dump_dir` is given, the source of pages that
/// produced nothing is saved there for inspection.
#[instrument(level = "info", skip_all, fields(%query, %day))]
pub async fn harvest<B: Browser>(
    nav: &mut Navigator<B>,
    config: &CrawlConfig,
    query: &str,
    day: NaiveDate,
    dump_dir: Option<&Path>,
) -> Vec<SeedRecord> {
    let locators = &config.locators;
    let url = build_search_url(query, day);
    info!(%url, "Harvesting search results");

    let label = format!("{}_{}", query.replace(' ', "_"), day.format("%Y%m%d"));
    if !nav.navigate(&url).await {
        warn!("Search page failed to load");
        dump_page(nav, dump_dir, &format!("{label}_init_fail")).await;
        return Vec::new();
    }
    if !results_ready(nav, config).await {
        warn!("Search results never appeared");
        dump_page(nav, dump_dir, &format!("{label}_init_fail")).await;
        return Vec::new();
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut visited: HashSet<String> = nav.current_url().map(str::to_string).into_iter().collect();
    let mut seeds = Vec::new();
    let mut page = 1usize;

    loop {
        if let Err(e) = nav
            .stimulate(nav.timing().results_scroll_steps, RESULTS_SCROLL_FRACTION)
            .await
        {
            warn!(page, error = %e, "Lost the results page");
            break;
        }

        let anchors = nav.query_all(&locators.search_titles);
        if anchors.is_empty() {
            warn!(page, "No result titles on page");
            dump_page(nav, dump_dir, &format!("{label}_p{page}_no_titles")).await;
        }

        let before = seeds.len();
        for anchor in anchors {
            let Some(href) = anchor.attr("href").map(str::trim).filter(|h| !h.is_empty()) else {
                continue;
            };
            if !href.contains(POST_HOST) {
                continue;
            }
            if !seen.insert(href.to_string()) {
                continue;
            }
            let title = if anchor.text.is_empty() {
                clean_text(anchor.attr("title").unwrap_or_default())
            } else {
                anchor.text.clone()
            };
            debug!(%href, title = %truncate_for_log(&title, 60), "Seed");
            seeds.push(SeedRecord {
                date: day,
                keyword_group: query.to_string(),
                title,
                url: href.to_string(),
            });
        }
        debug!(page, added = seeds.len() - before, total = seeds.len(), "Collected page");

        if page >= config.max_pages {
            info!(page, max_pages = config.max_pages, "Reached page cap");
            break;
        }
        if !nav.click_first(&locators.next_page).await {
            break;
        }
        if let Some(current) = nav.current_url() {
            if !visited.insert(current.to_string()) {
                debug!(%current, "Next control led back to a visited page");
                break;
            }
        }
        page += 1;
        nav.pause().await;
    }

    info!(count = seeds.len(), pages = page, "Harvested seed links");
    seeds
}

/// Wait for a title anchor or the no-results notice.
async fn results_ready<B: Browser>(nav: &Navigator<B>, config: &CrawlConfig) -> bool {
    let titles = &config.locators.search_titles;
    let no_results = config.locators.no_results_text.as_str();
    nav.wait_until(nav.timing().results_wait(), |b| {
        titles
            .iter()
            .any(|l| b.query(l).is_ok_and(|els| !els.is_empty()))
            || (!no_results.is_empty() && b.page_source().is_some_and(|s| s.contains(no_results)))
    })
    .await
}

async fn dump_page<B: Browser>(nav: &Navigator<B>, dump_dir: Option<&Path>, label: &str) {
    let (Some(dir), Some(source)) = (dump_dir, nav.page_source()) else {
        return;
    };
    let path = dir.join(format!("DEBUG_{label}.html"));
    let written = match fs::create_dir_all(dir).await {
        Ok(()) => fs::write(&path, source).await,
        Err(e) => Err(e),
    };
    match written {
        Ok(()) => info!(path = %path.display(), "Saved debug page"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to save debug page"),
    }
}
