//! # Blog Harvester
//!
//! A daily crawler that collects neighborhood blog posts from search results
//! and stores them as CSV files partitioned by keyword and day.
//!
//! ## Features
//!
//! - Searches the blog index for a fixed set of neighborhood keywords,
//!   restricted to a single day
//! - Extracts author, publish date, body, hashtags, media and engagement
//!   counts from every matched post, following the embedded post frame of
//!   desktop blog pages
//! - Ordered fallback locator lists for every field, configurable via YAML
//! - Writes BOM-prefixed CSV files that open cleanly in spreadsheet tools
//!
//! ## Usage
//!
//! ```sh
//! blog_harvester --date 2025-03-09 -o ./data_html
//! ```
//!
//! ## Architecture
//!
//! The application runs two sequential stages per keyword group:
//! 1. **Links**: Harvest candidate post URLs from the paginated search results
//! 2. **Posts**: Open each post in its canonical view and extract one record
//!
//! Every fault below the pipeline is logged and folded into the output; a
//! day's run always completes.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod browser;
mod cli;
mod config;
mod error;
mod models;
mod navigator;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use browser::{HttpSource, StaticBrowser};
use cli::Cli;
use config::CrawlConfig;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("blog_harvester starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Load config, CLI flags win ----
    let mut config = CrawlConfig::load(args.config.as_deref()).inspect_err(|e| {
        error!(error = %e, "Failed to load configuration");
    })?;
    if let Some(dir) = &args.output_dir {
        config.base_dir = dir.clone();
    }
    if let Some(max_pages) = args.max_pages {
        config.max_pages = max_pages;
    }

    let day = args.target_day(Local::now().date_naive());
    info!(
        %day,
        stage = ?args.stage,
        keyword_groups = config.keywords.len(),
        base_dir = %config.base_dir.display(),
        "Crawl configured"
    );

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&config.base_dir).await {
        error!(
            path = %config.base_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // Early check: the HTTP client builds
    let page_load = config.timing.page_load();
    HttpSource::new(page_load)?;

    let summary = pipeline::run(&config, day, args.stage, || {
        Ok(StaticBrowser::new(HttpSource::new(page_load)?))
    })
    .await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        links = summary.links_written,
        posts = summary.posts_written,
        skipped_groups = summary.groups_skipped,
        "Execution complete"
    );

    Ok(())
}
