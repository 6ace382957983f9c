//! Crawl configuration.
//!
//! Everything that varies between deployments of the pipeline (keyword
//! groups, output location, locator fallback lists, waits) lives in
//! [`CrawlConfig`]. It can be loaded from a YAML file; every field has a
//! default, so a partial file only overrides what it names.
//!
//! ```yaml
//! base_dir: ./data_html
//! max_pages: 30
//! keywords:
//!   - query: 성수동 명소
//!     region: 성수동
//! timing:
//!   pause_min_ms: 500
//!   pause_max_ms: 900
//! ```

use crate::error::Result;
use crate::utils::sanitize_for_fname;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

/// A search keyword and the administrative area it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeywordGroup {
    /// Search query, e.g. `"성수동 명소"`.
    pub query: String,
    /// Region tag written to every post of this group, e.g. `"성수동"`.
    pub region: String,
}

impl KeywordGroup {
    pub fn new(query: &str, region: &str) -> Self {
        Self {
            query: query.to_string(),
            region: region.to_string(),
        }
    }

    /// Filename-safe form of the query, used for the output partition.
    pub fn slug(&self) -> String {
        sanitize_for_fname(&self.query)
    }
}

/// Waits, pauses and scroll counts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Bound on a page load.
    pub page_load_secs: u64,
    /// Bound on waiting for search results to show up after loading.
    pub results_wait_secs: u64,
    /// Bound on waiting for the embedded post frame.
    pub frame_wait_secs: u64,
    /// Bound on waiting for like/comment widgets.
    pub engagement_wait_secs: u64,
    /// Interval between checks while waiting.
    pub poll_interval_ms: u64,
    /// Randomized pause range between page interactions.
    pub pause_min_ms: u64,
    pub pause_max_ms: u64,
    /// Scroll-and-pause cycles after every navigation.
    pub navigate_scroll_cycles: usize,
    /// Scroll-and-pause cycles on every search results page.
    pub results_scroll_steps: usize,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            page_load_secs: 25,
            results_wait_secs: 25,
            frame_wait_secs: 5,
            engagement_wait_secs: 8,
            poll_interval_ms: 250,
            pause_min_ms: 800,
            pause_max_ms: 1600,
            navigate_scroll_cycles: 2,
            results_scroll_steps: 4,
        }
    }
}

impl Timing {
    pub fn page_load(&self) -> Duration {
        Duration::from_secs(self.page_load_secs)
    }

    pub fn results_wait(&self) -> Duration {
        Duration::from_secs(self.results_wait_secs)
    }

    pub fn frame_wait(&self) -> Duration {
        Duration::from_secs(self.frame_wait_secs)
    }

    pub fn engagement_wait(&self) -> Duration {
        Duration::from_secs(self.engagement_wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Pause range in milliseconds. Bounds given in the wrong order are
    /// swapped.
    pub fn pause_range_ms(&self) -> (u64, u64) {
        let (min, max) = (self.pause_min_ms, self.pause_max_ms);
        if min <= max { (min, max) } else { (max, min) }
    }

    /// No pauses and no waiting; used by offline tests.
    #[cfg(test)]
    pub fn instant() -> Self {
        Self {
            page_load_secs: 1,
            results_wait_secs: 0,
            frame_wait_secs: 0,
            engagement_wait_secs: 0,
            poll_interval_ms: 0,
            pause_min_ms: 0,
            pause_max_ms: 0,
            navigate_scroll_cycles: 1,
            results_scroll_steps: 1,
        }
    }
}

/// Ordered fallback locator lists. Earlier entries win.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Locators {
    /// Result title anchors on the search page.
    pub search_titles: Vec<String>,
    /// "Next page" controls on the search page.
    pub next_page: Vec<String>,
    /// Literal text shown when a search has no results.
    pub no_results_text: String,
    /// Frame that wraps the desktop post view.
    pub post_frame: String,
    pub author: Vec<String>,
    pub publish_date: Vec<String>,
    /// Candidate main-content containers; the longest text wins.
    pub content_roots: Vec<String>,
    /// Tag elements searched inside each content root.
    pub hashtags: Vec<String>,
    /// Dedicated tag list containers searched across the whole page.
    pub tag_boxes: Vec<String>,
    /// Tag elements inside a tag list container.
    pub tag_box_items: Vec<String>,
    /// Image attributes in preference order (lazy-load first).
    pub image_attrs: Vec<String>,
    /// Substrings that mark an iframe as an embedded video.
    pub video_hosts: Vec<String>,
    /// Any of these appearing means the engagement widgets rendered.
    pub engagement: Vec<String>,
    pub likes: Vec<String>,
    pub comments: Vec<String>,
    /// Words searched in page text when the like locators miss.
    pub like_keywords: Vec<String>,
    /// Words searched in page text when the comment locators miss.
    pub comment_keywords: Vec<String>,
    /// Elements that only appear when a post has no comments.
    pub zero_comment_markers: Vec<String>,
    /// Phrases that only appear when a post has no comments.
    pub zero_comment_phrases: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Locators {
    fn default() -> Self {
        Self {
            search_titles: strings(&[
                "a.api_txt_lines.total_tit",
                "a.total_tit",
                "a.title_link",
                "div.total_wrap a[href*='blog.naver.com']",
                "a[href*='blog.naver.com']",
            ]),
            next_page: strings(&[
                "a.btn_next",
                "a.pg_next",
                "a.sc_page_next",
                "a[aria-label='다음']",
            ]),
            no_results_text: "검색결과가 없습니다".to_string(),
            post_frame: "iframe#mainFrame".to_string(),
            author: strings(&[
                "#nickNameArea",
                "strong#nickNameArea",
                "a.link.pcol2",
                "a.link_name",
                "a#gnb_name",
                "span.nick",
                "span.nick_name",
                "em.nick",
                "div.se_profile a",
                "div.bloger > a",
            ]),
            publish_date: strings(&[
                "span.se_publishDate",
                "span.se_date",
                "span#post_date",
                "p.date",
                "span.se_publishDate._postAddDate",
            ]),
            content_roots: strings(&[
                "div.se-main-container",
                "div.se_component_wrap",
                "#postViewArea",
                "#postListBody",
                "div#content-area",
                "div#viewTypeSelector",
                "div#_post_content",
                "div.se_textView",
                "article",
            ]),
            hashtags: strings(&[
                "span.se_hashtag",
                "a.link_tag",
                "a[href*='query=%23']",
                "i.pcol2b",
                "a.pcol2b",
                ".tag_area a",
                ".post_tag a",
            ]),
            tag_boxes: strings(&["div[id^='tagList_']"]),
            tag_box_items: strings(&[
                "a.item.pcol2.itemTagfont._setTop span.ell",
                "a.item span.ell",
                "a span.ell",
                "a.item.pcol2.itemTagfont._setTop",
                "a.item",
            ]),
            image_attrs: strings(&["data-lazy-src", "data-src", "src"]),
            video_hosts: strings(&[
                "youtube.com",
                "tv.naver.com",
                "serviceapi.rmcnmv.naver.com",
                "player.vimeo.com",
            ]),
            engagement: strings(&[
                "span.u_likeit_text._count.num",
                "span.u_likeit_list_count._count",
                "span.u_cnt._commentCount",
                "[id*='CommentCount'], #commentCount, #naverCommentCount",
                "#floating_bottom_commentCount",
            ]),
            likes: strings(&[
                "span.u_likeit_text._count.num",
                "span.u_likeit_list_count._count",
                "button.u_likeit_list_btn span.u_cnt",
                "span._count._sympathyCount",
                "em.u_cnt._count",
            ]),
            comments: strings(&[
                "span.u_cnt._commentCount",
                "a#CommentCount",
                "a#naverCommentCount",
                "#commentCount",
                "span#commentCount",
                "a[href*='comment'] span.num",
                "span.u_cbox_count",
                "em.u_cbox_count",
                "#floating_bottom_commentCount",
                "em#floating_bottom_commentCount",
            ]),
            like_keywords: strings(&["공감"]),
            comment_keywords: strings(&["댓글"]),
            zero_comment_markers: strings(&[
                "#comment_zero_label",
                "button#commentOpen",
                "a#commentOpen",
                "div.comment_area_empty",
                "div.u_cbox_wrap",
            ]),
            zero_comment_phrases: strings(&[
                "댓글 쓰기",
                "댓글쓰기",
                "댓글 작성",
                "첫 댓글을 남겨보세요",
                "댓글을 입력해 주세요",
            ]),
        }
    }
}

/// Top-level crawl configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Root of the partitioned CSV output.
    pub base_dir: PathBuf,
    /// Upper bound on search result pages visited per keyword and day.
    pub max_pages: usize,
    /// Save the page source when a search page yields nothing.
    pub debug_dumps: bool,
    pub keywords: Vec<KeywordGroup>,
    pub timing: Timing,
    pub locators: Locators,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./data_html"),
            max_pages: 50,
            debug_dumps: true,
            keywords: vec![
                KeywordGroup::new("성수동 명소", "성수동"),
                KeywordGroup::new("연남동 명소", "연남동"),
                KeywordGroup::new("익선동 명소", "익선동"),
                KeywordGroup::new("을지로 명소", "을지로"),
                KeywordGroup::new("신사동 명소", "신사동"),
                KeywordGroup::new("공릉동 명소", "공릉동"),
                KeywordGroup::new("한남동 명소", "한남동"),
            ],
            timing: Timing::default(),
            locators: Locators::default(),
        }
    }
}

impl CrawlConfig {
    /// Parse a YAML document. Blank input yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from `path`, or fall back to the defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file given; using built-in defaults");
            return Ok(Self::default());
        };
        let yaml = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&yaml)?;
        info!(
            keyword_groups = config.keywords.len(),
            base_dir = %config.base_dir.display(),
            "Loaded configuration"
        );
        Ok(config)
    }
}
