//! Daily run over every keyword group.
//!
//! Stage 1 harvests all groups in one browser session and writes a links file
//! per group. Stage 2 then reads each group's links file back, keeps the post
//! URLs and extracts them one by one in a fresh session per group, writing a
//! posts file in input order.
//!
//! Nothing here aborts the run: a group whose links cannot be harvested,
//! read or written is logged and skipped, and the next group proceeds.

use crate::browser::Browser;
use crate::cli::Stage;
use crate::config::{CrawlConfig, KeywordGroup};
use crate::error::Result;
use crate::navigator::Navigator;
use crate::outputs::{links_dir, links_path, posts_path, tables};
use crate::scrapers::{post, search};
use chrono::NaiveDate;
use tracing::{error, info, instrument, warn};

/// Totals of one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub links_written: usize,
    pub posts_written: usize,
    pub groups_skipped: usize,
}

/// Run `stage` for every configured keyword group on `day`.
///
/// `open_session` starts a new browser session; it is called once for
/// Stage 1 and once per group for Stage 2.
#[instrument(level = "info", skip_all, fields(%day, ?stage, groups = config.keywords.len()))]
pub async fn run<B, F>(config: &CrawlConfig, day: NaiveDate, stage: Stage, mut open_session: F) -> RunSummary
where
    B: Browser,
    F: FnMut() -> Result<B>,
{
    let mut summary = RunSummary::default();

    if stage.runs_links() {
        match open_session() {
            Ok(browser) => {
                let mut nav = navigator(config, browser);
                for group in &config.keywords {
                    summary.links_written += harvest_group(&mut nav, config, group, day).await;
                }
            }
            Err(e) => error!(error = %e, "Could not start a browser session; skipping link harvest"),
        }
    }

    if stage.runs_posts() {
        for group in &config.keywords {
            match extract_group(config, group, day, &mut open_session).await {
                Some(count) => summary.posts_written += count,
                None => summary.groups_skipped += 1,
            }
        }
    }

    info!(?summary, "Run finished");
    summary
}

fn navigator<B: Browser>(config: &CrawlConfig, browser: B) -> Navigator<B> {
    Navigator::new(browser, config.timing.clone(), &config.locators.post_frame)
}

async fn harvest_group<B: Browser>(
    nav: &mut Navigator<B>,
    config: &CrawlConfig,
    group: &KeywordGroup,
    day: NaiveDate,
) -> usize {
    let slug = group.slug();
    let dump_dir = config
        .debug_dumps
        .then(|| links_dir(&config.base_dir, &slug, day));

    let seeds = search::harvest(nav, config, &group.query, day, dump_dir.as_deref()).await;
    let path = links_path(&config.base_dir, &slug, day);
    match tables::write_links(&path, &seeds).await {
        Ok(count) => count,
        Err(e) => {
            error!(keyword = %group.query, path = %path.display(), error = %e, "Failed to write links");
            0
        }
    }
}

/// Stage 2 for one group. `None` when the group was skipped.
#[instrument(level = "info", skip_all, fields(keyword = %group.query))]
async fn extract_group<B, F>(
    config: &CrawlConfig,
    group: &KeywordGroup,
    day: NaiveDate,
    open_session: &mut F,
) -> Option<usize>
where
    B: Browser,
    F: FnMut() -> Result<B>,
{
    let slug = group.slug();
    let links = links_path(&config.base_dir, &slug, day);
    if !links.exists() {
        warn!(path = %links.display(), "No links file; skipping posts");
        return None;
    }
    let seeds = match tables::read_links(&links, &group.query, day).await {
        Ok(seeds) => seeds,
        Err(e) => {
            warn!(path = %links.display(), error = %e, "Unreadable links file; skipping posts");
            return None;
        }
    };
    if seeds.is_empty() {
        warn!(path = %links.display(), "Links file is empty; skipping posts");
        return None;
    }

    let before = seeds.len();
    let seeds: Vec<_> = seeds
        .into_iter()
        .filter(|s| post::is_post_url(&s.url))
        .collect();
    info!(before, after = seeds.len(), "Kept post URLs");
    if seeds.is_empty() {
        warn!("No post URLs among the links; skipping posts");
        return None;
    }

    let mut nav = match open_session() {
        Ok(browser) => navigator(config, browser),
        Err(e) => {
            error!(error = %e, "Could not start a browser session; skipping posts");
            return None;
        }
    };

    let total = seeds.len();
    let mut records = Vec::with_capacity(total);
    for (i, seed) in seeds.iter().enumerate() {
        info!("[{}/{}] {}", i + 1, total, seed.url);
        let record = post::extract(&mut nav, &config.locators, seed, &group.region).await;
        info!(status = %record.status, "[{}/{}] done", i + 1, total);
        records.push(record);
    }

    let path = posts_path(&config.base_dir, &slug, day);
    match tables::write_posts(&path, &records).await {
        Ok(count) => Some(count),
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to write posts");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::StaticBrowser;
    use crate::browser::fixture::FixtureSource;
    use crate::config::Timing;
    use crate::error::CrawlError;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
    }

    fn config(base: &std::path::Path) -> CrawlConfig {
        CrawlConfig {
            base_dir: base.to_path_buf(),
            keywords: vec![KeywordGroup::new("성수동 명소", "성수동")],
            timing: Timing::instant(),
            ..CrawlConfig::default()
        }
    }

    fn site() -> FixtureSource {
        let results = r#"<html><body><ul>
            <li><a class="title_link" href="https://m.blog.naver.com/alice/223">성수 산책</a></li>
            <li><a class="title_link" href="https://blog.naver.com/alice">앨리스 블로그</a></li>
            <li><a class="title_link" href="https://m.blog.naver.com/bob/42">카페 투어</a></li>
        </ul></body></html>"#;
        FixtureSource::new()
            .page(&search::build_search_url("성수동 명소", day()), results)
            .page(
                "https://m.blog.naver.com/alice/223",
                r#"<html><body><div class="se-main-container">골목 산책</div></body></html>"#,
            )
            .page(
                "https://m.blog.naver.com/bob/42",
                r#"<html><body><div class="se-main-container">카페 네 곳</div></body></html>"#,
            )
    }

    #[tokio::test]
    async fn test_run_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let source = site();
        let mut sessions = 0;
        let summary = run(&config, day(), Stage::All, || {
            sessions += 1;
            Ok(StaticBrowser::new(source.clone()))
        })
        .await;

        assert_eq!(
            summary,
            RunSummary {
                links_written: 3,
                posts_written: 2,
                groups_skipped: 0
            }
        );
        assert_eq!(sessions, 2);

        let links = std::fs::read_to_string(links_path(tmp.path(), "성수동_명소", day())).unwrap();
        assert!(links.contains("https://blog.naver.com/alice\n"));

        let posts = std::fs::read(posts_path(tmp.path(), "성수동_명소", day())).unwrap();
        let mut reader = csv::Reader::from_reader(&posts[3..]);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][3], "https://m.blog.naver.com/alice/223");
        assert_eq!(&rows[0][7], "골목 산책");
        assert_eq!(&rows[1][3], "https://m.blog.naver.com/bob/42");
        assert!(rows.iter().all(|r| &r[16] == "ok" && &r[1] == "성수동"));
        assert!(rows.iter().all(|r| &r[3] != "https://blog.naver.com/alice"));
    }

    #[tokio::test]
    async fn test_posts_stage_without_links_skips_group() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let mut sessions = 0;
        let summary = run(&config, day(), Stage::Posts, || {
            sessions += 1;
            Ok(StaticBrowser::new(FixtureSource::new()))
        })
        .await;

        assert_eq!(summary.groups_skipped, 1);
        assert_eq!(sessions, 0);
        assert!(!posts_path(tmp.path(), "성수동_명소", day()).exists());
    }

    #[tokio::test]
    async fn test_links_stage_only() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let source = site();
        let summary = run(&config, day(), Stage::Links, || {
            Ok(StaticBrowser::new(source.clone()))
        })
        .await;

        assert_eq!(summary.links_written, 3);
        assert_eq!(summary.posts_written, 0);
        assert!(links_path(tmp.path(), "성수동_명소", day()).exists());
        assert!(!posts_path(tmp.path(), "성수동_명소", day()).exists());
    }

    #[tokio::test]
    async fn test_session_failure_does_not_abort() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let summary = run(&config, day(), Stage::All, || {
            Err::<StaticBrowser<FixtureSource>, _>(CrawlError::Timeout(std::time::Duration::from_secs(1)))
        })
        .await;
        assert_eq!(summary.links_written, 0);
        assert_eq!(summary.groups_skipped, 1);
    }
}
