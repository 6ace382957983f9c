//! Partitioned CSV output.
//!
//! Every keyword group and day gets one Stage-1 links file and one Stage-2
//! posts file, laid out as:
//!
//! ```text
//! base_dir/
//! └── 성수동_명소/
//!     └── 2025/
//!         ├── links/
//!         │   ├── links_성수동_명소_20250309.csv
//!         │   └── DEBUG_성수동_명소_20250309_init_fail.html
//!         └── blog_posts/
//!             └── blog_posts_성수동_명소_20250309.csv
//! ```
//!
//! A re-run for the same day overwrites both files.
//!
//! # Submodules
//!
//! - [`tables`]: BOM-prefixed CSV encoding and decoding of both record kinds

pub mod tables;

use chrono::{Datelike, NaiveDate};
use std::path::{Path, PathBuf};

fn year_dir(base: &Path, slug: &str, day: NaiveDate) -> PathBuf {
    base.join(slug).join(day.year().to_string())
}

/// Directory holding the links file and debug dumps of a partition.
pub fn links_dir(base: &Path, slug: &str, day: NaiveDate) -> PathBuf {
    year_dir(base, slug, day).join("links")
}

pub fn links_path(base: &Path, slug: &str, day: NaiveDate) -> PathBuf {
    links_dir(base, slug, day).join(format!("links_{slug}_{}.csv", day.format("%Y%m%d")))
}

pub fn posts_path(base: &Path, slug: &str, day: NaiveDate) -> PathBuf {
    year_dir(base, slug, day)
        .join("blog_posts")
        .join(format!("blog_posts_{slug}_{}.csv", day.format("%Y%m%d")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_paths() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let base = Path::new("/data");
        assert_eq!(
            links_path(base, "성수동_명소", day),
            PathBuf::from("/data/성수동_명소/2025/links/links_성수동_명소_20250309.csv")
        );
        assert_eq!(
            posts_path(base, "성수동_명소", day),
            PathBuf::from("/data/성수동_명소/2025/blog_posts/blog_posts_성수동_명소_20250309.csv")
        );
    }
}
