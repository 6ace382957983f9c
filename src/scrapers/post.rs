//! Stage 2: extract one post record per seed.
//!
//! Extraction never fails as a whole. A seed that does not look like a post
//! is skipped without loading anything, a post whose canonical view cannot be
//! reached is marked as such, and a fault in any later step stops extraction
//! and is recorded as `error:<kind>` on the partially filled record.
//! Individual fields that simply are not on the page stay empty.

use super::{PROFILE_BASE, POST_VIEW_MARKER};
use crate::browser::{Browser, Element, Scroll};
use crate::config::Locators;
use crate::error::Result;
use crate::models::{PostRecord, PostStatus, SeedRecord};
use crate::navigator::Navigator;
use crate::utils::{normalize_hashtag, normalize_post_date, parse_count, truncate_chars};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Upper bound on stored body text, in characters.
pub const MAX_BODY_CHARS: usize = 200_000;

/// Sibling texts inspected after a count keyword.
const KEYWORD_SIBLINGS: usize = 3;

static POST_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^https?://(?:(?:m\.)?blog\.naver\.com/[^/]+/\d+|blog\.naver\.com/PostView\.naver\?.*?logNo=\d+)",
    )
    .unwrap()
});

/// Whether `url` points at a single blog post.
pub fn is_post_url(url: &str) -> bool {
    POST_URL.is_match(url.trim())
}

/// Author and post identifiers encoded in a post URL.
///
/// `PostView` documents carry them as `blogId`/`logNo` query parameters; the
/// path forms (`/{author}/{post}`, mobile or desktop) carry them as the first
/// two path segments. Unknown parts come back empty.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(extract_ids("https://m.blog.naver.com/alice/223"), ("alice".into(), "223".into()));
/// ```
pub fn extract_ids(url: &str) -> (String, String) {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return Default::default();
    };

    if parsed.path().contains(POST_VIEW_MARKER) {
        let mut author = String::new();
        let mut post = String::new();
        for (k, v) in parsed.query_pairs() {
            match k.as_ref() {
                "blogId" if author.is_empty() => author = v.into_owned(),
                "logNo" if post.is_empty() => post = v.into_owned(),
                _ => {}
            }
        }
        return (author, post);
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    match segments.as_slice() {
        [author, post, ..] if post.chars().all(|c| c.is_ascii_digit()) => {
            (author.to_string(), post.to_string())
        }
        [author, ..] => (author.to_string(), String::new()),
        [] => Default::default(),
    }
}

/// Extract the post behind `seed`, tagging it with `region_tag`.
#[instrument(level = "info", skip_all, fields(url = %seed.url))]
pub async fn extract<B: Browser>(
    nav: &mut Navigator<B>,
    locators: &Locators,
    seed: &SeedRecord,
    region_tag: &str,
) -> PostRecord {
    let mut record = PostRecord::for_seed(seed, region_tag);

    if !is_post_url(&seed.url) {
        debug!("Not a post URL; skipping");
        record.status = PostStatus::SkipNonPostUrl;
        return record;
    }

    if !nav.enter_canonical_view(&seed.url).await {
        warn!("Could not reach the post view");
        record.status = PostStatus::FailedGotoView;
        return record;
    }

    match fill_record(nav, locators, seed, &mut record).await {
        Ok(()) => {
            info!(
                author = %record.author_id,
                post = %record.post_id,
                body_chars = record.body_text.chars().count(),
                tags = record.hashtags.len(),
                images = record.image_urls.len(),
                likes = ?record.like_count,
                comments = ?record.comment_count,
                "Extracted post"
            );
        }
        Err(e) => {
            warn!(error = %e, "Extraction stopped early");
            record.status = PostStatus::Error(e.kind().to_string());
        }
    }
    record
}

async fn fill_record<B: Browser>(
    nav: &mut Navigator<B>,
    locators: &Locators,
    seed: &SeedRecord,
    record: &mut PostRecord,
) -> Result<()> {
    let resolved = nav.current_url().unwrap_or(seed.url.as_str()).to_string();
    let (mut author_id, mut post_id) = extract_ids(&resolved);
    if author_id.is_empty() || post_id.is_empty() {
        let (a, p) = extract_ids(&seed.url);
        if author_id.is_empty() {
            author_id = a;
        }
        if post_id.is_empty() {
            post_id = p;
        }
    }
    if !author_id.is_empty() {
        record.author_profile_url = format!("{PROFILE_BASE}/{author_id}");
    }

    let name = nav.query_first_text(&locators.author);
    record.author_display_name = if name.is_empty() { author_id.clone() } else { name };
    record.author_id = author_id;
    record.post_id = post_id;

    record.publish_date = nav
        .first_match(&locators.publish_date, |els| {
            els.iter()
                .map(|e| normalize_post_date(&e.text))
                .find(|d| !d.is_empty())
        })
        .unwrap_or_default();

    let roots = content_roots(nav, locators)?;
    record.body_text = longest_text(&roots);
    record.hashtags = hashtags(nav, locators, &roots);
    let (images, videos) = media(locators, &roots);
    record.image_urls = images;
    record.video_urls = videos;

    reveal_engagement(nav, locators).await?;

    record.like_count = count_by_locators(nav, &locators.likes)
        .or_else(|| count_by_keywords(nav, &locators.like_keywords));
    record.comment_count = count_by_locators(nav, &locators.comments)
        .or_else(|| count_by_keywords(nav, &locators.comment_keywords))
        .or_else(|| shows_zero_comments(nav, locators).then_some(0));

    if record.like_count.is_none() {
        probe_counts(nav, "likes", &locators.likes);
    }
    if record.comment_count.is_none() {
        probe_counts(nav, "comments", &locators.comments);
    }
    Ok(())
}

/// Every content-root match, or the whole `body` when none matches.
fn content_roots<B: Browser>(nav: &Navigator<B>, locators: &Locators) -> Result<Vec<Element>> {
    let roots = nav.query_union(&locators.content_roots);
    if !roots.is_empty() {
        return Ok(roots);
    }
    debug!("No content root matched; falling back to <body>");
    nav.query("body")
}

/// Longest root text; the first one wins a tie.
fn longest_text(roots: &[Element]) -> String {
    let body = roots
        .iter()
        .map(|r| (r.text.chars().count(), r.text.as_str()))
        .reduce(|best, next| if next.0 > best.0 { next } else { best })
        .map(|(_, text)| text)
        .unwrap_or_default();
    truncate_chars(body, MAX_BODY_CHARS)
}

fn hashtags<B: Browser>(nav: &Navigator<B>, locators: &Locators, roots: &[Element]) -> Vec<String> {
    let scoped = roots.iter().flat_map(|root| {
        locators
            .hashtags
            .iter()
            .filter_map(|l| root.select(l).ok())
            .flatten()
            .map(|e| e.text)
            .collect::<Vec<_>>()
    });

    let boxed = nav
        .query_union(&locators.tag_boxes)
        .into_iter()
        .flat_map(|tag_box| {
            locators
                .tag_box_items
                .iter()
                .filter_map(|l| tag_box.select(l).ok())
                .find(|items| !items.is_empty())
                .unwrap_or_default()
                .into_iter()
                .map(|e| e.text)
        });

    scoped
        .chain(boxed)
        .map(|raw| normalize_hashtag(&raw))
        .filter(|tag| !tag.is_empty())
        .unique()
        .collect()
}

fn is_http(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Image and embedded video URLs inside the content roots.
fn media(locators: &Locators, roots: &[Element]) -> (Vec<String>, Vec<String>) {
    let images = roots
        .iter()
        .flat_map(|root| root.select("img").unwrap_or_default())
        .filter_map(|img| img.first_attr(&locators.image_attrs).map(str::to_string))
        .filter(|src| is_http(src))
        .unique()
        .collect();

    let videos = roots
        .iter()
        .flat_map(|root| root.select("iframe").unwrap_or_default())
        .filter_map(|frame| frame.attr("src").map(|s| s.trim().to_string()))
        .filter(|src| locators.video_hosts.iter().any(|host| src.contains(host.as_str())))
        .unique()
        .collect();

    (images, videos)
}

/// Scroll through the post so like and comment widgets render, then wait
/// for any of them.
async fn reveal_engagement<B: Browser>(nav: &mut Navigator<B>, locators: &Locators) -> Result<()> {
    nav.scroll(Scroll::By(0.33)).await?;
    nav.pause().await;
    nav.scroll(Scroll::By(0.66)).await?;
    nav.pause().await;
    nav.scroll(Scroll::Bottom).await?;

    let limit = nav.timing().engagement_wait();
    if !nav.wait_for_any(&locators.engagement, limit).await {
        debug!(?limit, "Engagement widgets did not show up");
    }
    Ok(())
}

fn count_by_locators<B: Browser>(nav: &Navigator<B>, locators: &[String]) -> Option<u64> {
    nav.first_match(locators, |els| els.iter().find_map(|e| parse_count(&e.text)))
}

/// Count next to a keyword such as `공감`: in the keyword's own text, else in
/// one of the siblings right after it.
fn count_by_keywords<B: Browser>(nav: &Navigator<B>, keywords: &[String]) -> Option<u64> {
    keywords.iter().find_map(|keyword| {
        nav.find_text(keyword, KEYWORD_SIBLINGS).into_iter().find_map(|hit| {
            parse_count(&hit.text).or_else(|| hit.following.iter().find_map(|t| parse_count(t)))
        })
    })
}

/// Whether the page shows the empty comment state.
fn shows_zero_comments<B: Browser>(nav: &Navigator<B>, locators: &Locators) -> bool {
    let marker = locators
        .zero_comment_markers
        .iter()
        .any(|l| nav.query(l).is_ok_and(|els| !els.is_empty()));
    marker
        || locators
            .zero_comment_phrases
            .iter()
            .any(|phrase| !nav.find_text(phrase, 0).is_empty())
}

fn probe_counts<B: Browser>(nav: &Navigator<B>, field: &str, locators: &[String]) {
    for locator in locators {
        let hits = nav.query(locator).map(|els| els.len()).unwrap_or(0);
        debug!(field, %locator, hits, "Count probe");
    }
}
