//! Command-line interface definitions for the blog harvester.
//!
//! Flags override the matching values of the configuration file; everything
//! else (keyword groups, locators, waits) comes from the file or the
//! built-in defaults.

use chrono::{Days, NaiveDate};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Which crawl stages to run.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Harvest search results into links files only.
    Links,
    /// Extract posts from existing links files only.
    Posts,
    /// Both stages, links first.
    All,
}

impl Stage {
    pub fn runs_links(self) -> bool {
        matches!(self, Stage::Links | Stage::All)
    }

    pub fn runs_posts(self) -> bool {
        matches!(self, Stage::Posts | Stage::All)
    }
}

/// Command-line arguments for the blog harvester.
///
/// # Examples
///
/// ```sh
/// # Crawl yesterday with the built-in keyword groups
/// blog_harvester
///
/// # Re-extract posts for a given day into another directory
/// blog_harvester --date 2025-03-09 --stage posts -o /srv/blog
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Day to crawl (YYYY-MM-DD); defaults to yesterday
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Root directory of the CSV output [default: ./data_html]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "BLOG_HARVESTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Stages to run
    #[arg(long, value_enum, default_value_t = Stage::All)]
    pub stage: Stage,

    /// Maximum search result pages per keyword
    #[arg(long)]
    pub max_pages: Option<usize>,
}

impl Cli {
    /// The requested day, or the day before `today`.
    pub fn target_day(&self, today: NaiveDate) -> NaiveDate {
        self.date
            .or_else(|| today.checked_sub_days(Days::new(1)))
            .unwrap_or(today)
    }
}
