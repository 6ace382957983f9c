//! Records produced by the two crawl stages.
//!
//! - [`SeedRecord`]: a candidate post URL discovered on a search results page
//! - [`PostRecord`]: the extracted post, one per seed, with a [`PostStatus`]
//!
//! Column names for both CSV outputs live here too, because they are the
//! contract downstream consumers depend on.

use chrono::{NaiveDate, SecondsFormat, Utc};
use std::fmt;

/// Separator used when list fields are flattened into a single CSV cell.
pub const LIST_SEPARATOR: &str = "|";

/// Constant `platform` value of every post record.
pub const PLATFORM: &str = "blog";

/// Stage-1 CSV header.
pub const LINK_COLUMNS: [&str; 3] = ["date", "title", "link"];

/// Stage-2 CSV header, in output order.
pub const POST_COLUMNS: [&str; 17] = [
    "platform",
    "administrative_dong",
    "title",
    "link",
    "bloggername",
    "bloggerlink",
    "postdate",
    "content_raw",
    "hashtags",
    "images",
    "videos",
    "like_count",
    "comment_count",
    "author_id",
    "post_id",
    "crawled_at",
    "status",
];

/// A candidate post discovered by the search harvester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRecord {
    /// The day the search was scoped to.
    pub date: NaiveDate,
    /// The search keyword this seed was found under.
    pub keyword_group: String,
    /// Visible title of the search result.
    pub title: String,
    /// Link target of the search result.
    pub url: String,
}

impl SeedRecord {
    /// Row in [`LINK_COLUMNS`] order.
    pub fn to_row(&self) -> [String; 3] {
        [
            self.date.format("%Y-%m-%d").to_string(),
            self.title.clone(),
            self.url.clone(),
        ]
    }
}

/// Outcome of extracting a single post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostStatus {
    Ok,
    /// The seed URL does not look like a post; nothing was fetched.
    SkipNonPostUrl,
    /// The canonical document view could not be reached.
    FailedGotoView,
    /// Extraction stopped on a fault; the payload is the fault kind.
    Error(String),
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostStatus::Ok => f.write_str("ok"),
            PostStatus::SkipNonPostUrl => f.write_str("skip_non_post_url"),
            PostStatus::FailedGotoView => f.write_str("failed_goto_view"),
            PostStatus::Error(kind) => write!(f, "error:{kind}"),
        }
    }
}

/// A single extracted blog post.
///
/// Only `url`, `platform`, `crawled_at` and `status` are guaranteed to be
/// populated; every other field may be empty when its extraction missed.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub platform: &'static str,
    /// Administrative area label of the keyword group.
    pub region_tag: String,
    pub title: String,
    pub url: String,
    pub author_display_name: String,
    pub author_profile_url: String,
    /// `YYYYMMDD`, or empty.
    pub publish_date: String,
    pub body_text: String,
    pub hashtags: Vec<String>,
    pub image_urls: Vec<String>,
    pub video_urls: Vec<String>,
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub author_id: String,
    pub post_id: String,
    /// UTC, RFC 3339 with a `Z` suffix.
    pub crawled_at: String,
    pub status: PostStatus,
}

impl PostRecord {
    /// Empty record for `seed`, stamped with the current UTC time and status `ok`.
    pub fn for_seed(seed: &SeedRecord, region_tag: &str) -> Self {
        Self {
            platform: PLATFORM,
            region_tag: region_tag.to_string(),
            title: seed.title.clone(),
            url: seed.url.clone(),
            author_display_name: String::new(),
            author_profile_url: String::new(),
            publish_date: String::new(),
            body_text: String::new(),
            hashtags: Vec::new(),
            image_urls: Vec::new(),
            video_urls: Vec::new(),
            like_count: None,
            comment_count: None,
            author_id: String::new(),
            post_id: String::new(),
            crawled_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            status: PostStatus::Ok,
        }
    }

    /// Row in [`POST_COLUMNS`] order.
    pub fn to_row(&self) -> [String; 17] {
        let count = |c: Option<u64>| c.map(|n| n.to_string()).unwrap_or_default();
        [
            self.platform.to_string(),
            self.region_tag.clone(),
            self.title.clone(),
            self.url.clone(),
            self.author_display_name.clone(),
            self.author_profile_url.clone(),
            self.publish_date.clone(),
            self.body_text.clone(),
            self.hashtags.join(LIST_SEPARATOR),
            self.image_urls.join(LIST_SEPARATOR),
            self.video_urls.join(LIST_SEPARATOR),
            count(self.like_count),
            count(self.comment_count),
            self.author_id.clone(),
            self.post_id.clone(),
            self.crawled_at.clone(),
            self.status.to_string(),
        ]
    }
}
