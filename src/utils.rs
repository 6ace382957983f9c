//! Text normalization and file system helpers.
//!
//! Everything the extractors do to raw page text goes through here:
//! - Whitespace collapsing for rendered element text
//! - Hashtag normalization
//! - Count extraction from localized strings such as `"댓글 1,234개"`
//! - `YYYY. M. D.` date normalization
//! - Filename-safe slugs for output partitions
//! - Truncation for logs and for stored body text

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,]*").unwrap());
static DOTTED_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})\.\s*(\d{1,2})\.\s*(\d{1,2})").unwrap());
static FNAME_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\-.가-힣]+").unwrap());

/// Collapse every whitespace run to a single space and trim the ends.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_text("  a \n\t b  "), "a b");
/// ```
pub fn clean_text(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Normalize a raw tag into `#tag` form.
///
/// All whitespace is removed (tags never contain spaces) and a `#` prefix is
/// added when missing. Empty input stays empty, and an already normalized tag
/// comes back unchanged.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_hashtag("맛집 "), "#맛집");
/// assert_eq!(normalize_hashtag("#맛집"), "#맛집");
/// assert_eq!(normalize_hashtag(""), "");
/// ```
pub fn normalize_hashtag(raw: &str) -> String {
    let tag = WHITESPACE.replace_all(raw.trim(), "");
    if tag.is_empty() {
        return String::new();
    }
    if tag.starts_with('#') {
        tag.into_owned()
    } else {
        format!("#{tag}")
    }
}

/// Extract the first run of digits from a formatted count, ignoring thousands
/// separators.
///
/// Returns `None` when the text holds no digit at all.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_count("댓글 1,234개"), Some(1234));
/// assert_eq!(parse_count("공감 0"), Some(0));
/// assert_eq!(parse_count(""), None);
/// ```
pub fn parse_count(text: &str) -> Option<u64> {
    let m = COUNT.find(text)?;
    m.as_str().replace(',', "").parse().ok()
}

/// Normalize a `YYYY. M. D.` style date found anywhere in `raw` to `YYYYMMDD`.
///
/// Returns an empty string when no date-like substring is present or the
/// captured parts do not form a plausible date.
pub fn normalize_post_date(raw: &str) -> String {
    let Some(caps) = DOTTED_DATE.captures(raw) else {
        return String::new();
    };
    let parts = (
        caps[1].parse::<u32>(),
        caps[2].parse::<u32>(),
        caps[3].parse::<u32>(),
    );
    match parts {
        (Ok(y), Ok(m), Ok(d)) if (1..=12).contains(&m) && (1..=31).contains(&d) => {
            format!("{y:04}{m:02}{d:02}")
        }
        _ => String::new(),
    }
}

/// Turn a keyword into a filename-safe slug.
///
/// Spaces become underscores; anything other than word characters, `-`, `.`
/// and Hangul syllables is dropped.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_for_fname("성수동 명소"), "성수동_명소");
/// assert_eq!(sanitize_for_fname("a/b c?"), "ab_c");
/// ```
pub fn sanitize_for_fname(s: &str) -> String {
    let spaced = s.trim().replace(' ', "_");
    FNAME_UNSAFE.replace_all(&spaced, "").into_owned()
}

/// Keep at most `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number of
/// dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…(+{} bytes)", &s[..idx], s.len() - idx),
        None => s.to_string(),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or written to.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Sync write keeps the error surface simple.
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  hello \n\n  world\t"), "hello world");
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn test_normalize_hashtag() {
        assert_eq!(normalize_hashtag("맛집 "), "#맛집");
        assert_eq!(normalize_hashtag(""), "");
        assert_eq!(normalize_hashtag("   "), "");
        assert_eq!(normalize_hashtag("성수 카페"), "#성수카페");
        assert_eq!(normalize_hashtag("#already"), "#already");
    }

    #[test]
    fn test_normalize_hashtag_is_idempotent() {
        for raw in ["맛집 ", " #데이트 코스", "tag", ""] {
            let once = normalize_hashtag(raw);
            assert_eq!(normalize_hashtag(&once), once);
        }
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("댓글 1,234개"), Some(1234));
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("공감 0"), Some(0));
        assert_eq!(parse_count("공감하기"), None);
        assert_eq!(parse_count("12 of 40"), Some(12));
        assert_eq!(parse_count(", 7"), Some(7));
    }

    #[test]
    fn test_normalize_post_date() {
        assert_eq!(normalize_post_date("2025. 3. 9."), "20250309");
        assert_eq!(normalize_post_date("작성일 2024.12.31. 14:02"), "20241231");
        assert_eq!(normalize_post_date("3시간 전"), "");
        assert_eq!(normalize_post_date(""), "");
        assert_eq!(normalize_post_date("2025. 13. 1."), "");
    }

    #[test]
    fn test_sanitize_for_fname() {
        assert_eq!(sanitize_for_fname("성수동 명소"), "성수동_명소");
        assert_eq!(sanitize_for_fname("  을지로 명소 "), "을지로_명소");
        assert_eq!(sanitize_for_fname("a/b c?"), "ab_c");
        assert_eq!(sanitize_for_fname("v1.2-beta"), "v1.2-beta");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("한남동", 2), "한남");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let result = truncate_for_log("가나다라", 2);
        assert_eq!(result, "가나…(+6 bytes)");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
