//! CSV files of both stages.
//!
//! Files are UTF-8 with a byte order mark so spreadsheet tools pick the right
//! encoding for Hangul text. Reading tolerates the mark, header case and a
//! missing `title` column, since links files may have been edited by hand.

use crate::error::{CrawlError, Result};
use crate::models::{LINK_COLUMNS, POST_COLUMNS, PostRecord, SeedRecord};
use chrono::NaiveDate;
use itertools::Itertools;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

const BOM: &[u8] = b"\xEF\xBB\xBF";

fn encode<R, I>(header: &[&str], rows: I) -> Result<Vec<u8>>
where
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
    I: IntoIterator<Item = R>,
{
    let mut writer = csv::Writer::from_writer(BOM.to_vec());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.into_inner().map_err(|e| CrawlError::Io(e.into_error()))
}

async fn write_file(path: &Path, bytes: Vec<u8>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, bytes).await?;
    Ok(())
}

/// Write the links of one harvest, de-duplicated by link.
///
/// An empty harvest writes nothing, so an existing file from an earlier run
/// is left alone. Returns the number of rows written.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_links(path: &Path, seeds: &[SeedRecord]) -> Result<usize> {
    let rows: Vec<[String; 3]> = seeds
        .iter()
        .unique_by(|s| s.url.as_str())
        .map(SeedRecord::to_row)
        .collect();
    if rows.is_empty() {
        info!("No links harvested; nothing written");
        return Ok(0);
    }

    let count = rows.len();
    write_file(path, encode(&LINK_COLUMNS, rows)?).await?;
    info!(count, "Wrote links file");
    Ok(count)
}

/// Read a links file back into seeds for `keyword_group` on `day`.
///
/// Headers match case-insensitively. A missing `link` column is an error; a
/// missing `title` column yields empty titles. Rows without a link are
/// dropped, as are repeated links.
#[instrument(level = "info", skip(path), fields(path = %path.display()))]
pub async fn read_links(path: &Path, keyword_group: &str, day: NaiveDate) -> Result<Vec<SeedRecord>> {
    let bytes = fs::read(path).await?;
    let body = bytes.strip_prefix(BOM).unwrap_or(&bytes);

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(body);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let link_at = column("link").ok_or(CrawlError::MissingColumn("link"))?;
    let title_at = column("title");
    if title_at.is_none() {
        warn!("Links file has no title column; titles left empty");
    }

    let mut seeds = Vec::new();
    for row in reader.records() {
        let row = row?;
        let url = row.get(link_at).unwrap_or_default().trim();
        if url.is_empty() {
            continue;
        }
        seeds.push(SeedRecord {
            date: day,
            keyword_group: keyword_group.to_string(),
            title: title_at
                .and_then(|i| row.get(i))
                .unwrap_or_default()
                .trim()
                .to_string(),
            url: url.to_string(),
        });
    }

    let total = seeds.len();
    let seeds: Vec<SeedRecord> = seeds.into_iter().unique_by(|s| s.url.clone()).collect();
    info!(rows = total, unique = seeds.len(), "Read links file");
    Ok(seeds)
}

/// Write the extracted posts of one partition, in input order.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_posts(path: &Path, records: &[PostRecord]) -> Result<usize> {
    let bytes = encode(&POST_COLUMNS, records.iter().map(PostRecord::to_row))?;
    write_file(path, bytes).await?;
    info!(count = records.len(), "Wrote posts file");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PostStatus;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
    }

    fn seed(title: &str, url: &str) -> SeedRecord {
        SeedRecord {
            date: day(),
            keyword_group: "성수동 명소".to_string(),
            title: title.to_string(),
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_write_links_dedupes_and_prefixes_bom() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("a/b/links.csv");
        let seeds = vec![
            seed("첫 글, 쉼표", "https://blog.naver.com/a/1"),
            seed("다시", "https://blog.naver.com/a/1"),
            seed("둘", "https://blog.naver.com/b/2"),
        ];
        assert_eq!(write_links(&path, &seeds).await.unwrap(), 2);

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(BOM));
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        assert_eq!(
            text,
            "date,title,link\n\
             2025-03-09,\"첫 글, 쉼표\",https://blog.naver.com/a/1\n\
             2025-03-09,둘,https://blog.naver.com/b/2\n"
        );

        let back = read_links(&path, "성수동 명소", day()).await.unwrap();
        assert_eq!(back, seeds.into_iter().unique_by(|s| s.url.clone()).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_harvest_writes_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("links.csv");
        assert_eq!(write_links(&path, &[]).await.unwrap(), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_read_links_tolerates_hand_edited_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("links.csv");
        std::fs::write(
            &path,
            "Date, LINK \n2025-03-09,https://blog.naver.com/a/1\n2025-03-09,\n2025-03-09,https://blog.naver.com/a/1\n",
        )
        .unwrap();

        let seeds = read_links(&path, "연남동 명소", day()).await.unwrap();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].title, "");
        assert_eq!(seeds[0].url, "https://blog.naver.com/a/1");
        assert_eq!(seeds[0].keyword_group, "연남동 명소");
    }

    #[tokio::test]
    async fn test_read_links_requires_link_column() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("links.csv");
        std::fs::write(&path, "date,title\n2025-03-09,x\n").unwrap();
        let err = read_links(&path, "k", day()).await.unwrap_err();
        assert_eq!(err.kind(), "MissingColumn");
    }

    #[tokio::test]
    async fn test_write_posts_header_and_row() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("posts.csv");
        let mut record = PostRecord::for_seed(&seed("글", "https://m.blog.naver.com/a/1"), "성수동");
        record.hashtags = vec!["#성수".to_string(), "#카페".to_string()];
        record.like_count = Some(3);
        record.status = PostStatus::FailedGotoView;
        write_posts(&path, &[record]).await.unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(BOM));
        let mut reader = csv::Reader::from_reader(&bytes[3..]);
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, POST_COLUMNS);
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "blog");
        assert_eq!(&rows[0][1], "성수동");
        assert_eq!(&rows[0][8], "#성수|#카페");
        assert_eq!(&rows[0][11], "3");
        assert_eq!(&rows[0][12], "");
        assert_eq!(&rows[0][16], "failed_goto_view");
    }
}
