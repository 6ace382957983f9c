//! [`Browser`] over fetched HTML.
//!
//! Pages come from a [`PageSource`] (normally [`HttpSource`]) and are parsed
//! once with `scraper`. Nothing executes scripts, so scrolling is a no-op and
//! the document never changes between queries. Clicking an element follows
//! its `href`.

use super::{Browser, Element, Scroll, TextHit, is_rendered, parse_locator, rendered_text};
use crate::error::{CrawlError, Result};
use crate::utils::clean_text;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use scraper::{ElementRef, Html};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";

/// A fetched page body and the location it was finally served from.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: String,
    pub body: String,
}

/// Something that can fetch a page by URL.
pub trait PageSource {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// [`PageSource`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    /// Build a client with a per-request `timeout` and Korean locale headers.
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("ko-KR,ko;q=0.9"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;
        Ok(Self { client })
    }
}

impl PageSource for HttpSource {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let final_url = resp.url().to_string();
        if !status.is_success() {
            return Err(CrawlError::Status {
                status: status.as_u16(),
                url: final_url,
            });
        }
        let body = resp.text().await?;
        debug!(bytes = body.len(), %final_url, "Fetched page");
        Ok(FetchedPage { final_url, body })
    }
}

struct Document {
    url: String,
    source: String,
    html: Html,
}

/// Browser session over a [`PageSource`].
pub struct StaticBrowser<S> {
    source: S,
    current: Option<Document>,
    navigations: usize,
}

impl<S: PageSource> StaticBrowser<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            current: None,
            navigations: 0,
        }
    }

    /// Number of `open` calls made by this session, failed ones included.
    pub fn navigations(&self) -> usize {
        self.navigations
    }

    fn document(&self) -> Result<&Document> {
        self.current.as_ref().ok_or(CrawlError::NoDocument)
    }
}

impl<S: PageSource> Browser for StaticBrowser<S> {
    async fn open(&mut self, url: &str) -> Result<()> {
        self.navigations += 1;
        self.current = None;
        let page = self.source.fetch(url).await?;
        let html = Html::parse_document(&page.body);
        self.current = Some(Document {
            url: page.final_url,
            source: page.body,
            html,
        });
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.current.is_some()
    }

    fn current_url(&self) -> Option<&str> {
        self.current.as_ref().map(|d| d.url.as_str())
    }

    fn page_source(&self) -> Option<&str> {
        self.current.as_ref().map(|d| d.source.as_str())
    }

    async fn scroll(&mut self, _to: Scroll) -> Result<()> {
        self.document().map(|_| ())
    }

    fn query(&self, locator: &str) -> Result<Vec<Element>> {
        let selector = parse_locator(locator)?;
        let doc = self.document()?;
        Ok(doc.html.select(&selector).map(Element::from_ref).collect())
    }

    fn find_text(&self, needle: &str, siblings: usize) -> Result<Vec<TextHit>> {
        let doc = self.document()?;
        let mut hits = Vec::new();
        for el in doc.html.root_element().descendants().filter_map(ElementRef::wrap) {
            if !is_rendered(el) {
                continue;
            }
            let own = el
                .children()
                .filter_map(|n| n.value().as_text())
                .fold(String::new(), |mut acc, t| {
                    acc.push_str(t);
                    acc.push(' ');
                    acc
                });
            let own = clean_text(&own);
            if own.is_empty() || !own.contains(needle) {
                continue;
            }
            let following = el
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .take(siblings)
                .map(rendered_text)
                .collect();
            hits.push(TextHit {
                text: own,
                following,
            });
        }
        Ok(hits)
    }

    async fn click(&mut self, element: &Element) -> Result<bool> {
        if element.attr("aria-disabled") == Some("true") {
            return Ok(false);
        }
        let Some(href) = element.attr("href").map(str::trim) else {
            return Ok(false);
        };
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return Ok(false);
        }
        let base = Url::parse(&self.document()?.url)?;
        let target = base.join(href)?;
        if target == base {
            return Ok(false);
        }
        self.open(target.as_str()).await?;
        Ok(true)
    }

    fn renders_dynamically(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fixture::FixtureSource;

    fn browser() -> StaticBrowser<FixtureSource> {
        let source = FixtureSource::new()
            .page(
                "https://example.com/a",
                r#"<html><body>
                    <div id="likes"><span>공감</span><em>12</em><em>99</em></div>
                    <script>var 공감 = 5;</script>
                    <a class="next" href="/b">다음</a>
                    <a class="off" href="/c" aria-disabled="true">끝</a>
                    <a class="js" href="javascript:void(0)">js</a>
                </body></html>"#,
            )
            .page("https://example.com/b", "<html><body><p>page b</p></body></html>");
        StaticBrowser::new(source)
    }

    #[tokio::test]
    async fn test_open_and_query() {
        let mut b = browser();
        assert!(!b.is_ready());
        b.open("https://example.com/a").await.unwrap();
        assert!(b.is_ready());
        assert_eq!(b.current_url(), Some("https://example.com/a"));
        assert_eq!(b.query("a.next").unwrap()[0].text, "다음");
        assert!(b.page_source().unwrap().contains(r#"id="likes""#));
        assert_eq!(b.navigations(), 1);
    }

    #[tokio::test]
    async fn test_failed_open_clears_document() {
        let mut b = browser();
        b.open("https://example.com/a").await.unwrap();
        assert!(b.open("https://example.com/missing").await.is_err());
        assert!(!b.is_ready());
        assert_eq!(b.current_url(), None);
        assert!(matches!(b.query("p"), Err(CrawlError::NoDocument)));
        assert!(b.scroll(Scroll::Bottom).await.is_err());
        assert_eq!(b.navigations(), 2);
    }

    #[tokio::test]
    async fn test_find_text_ignores_scripts_and_collects_siblings() {
        let mut b = browser();
        b.open("https://example.com/a").await.unwrap();
        let hits = b.find_text("공감", 3).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "공감");
        assert_eq!(hits[0].following, vec!["12", "99"]);
    }

    #[tokio::test]
    async fn test_click_follows_href() {
        let mut b = browser();
        b.open("https://example.com/a").await.unwrap();
        let next = b.query("a.next").unwrap().remove(0);
        assert!(b.click(&next).await.unwrap());
        assert_eq!(b.current_url(), Some("https://example.com/b"));
    }

    #[tokio::test]
    async fn test_click_refuses_dead_controls() {
        let mut b = browser();
        b.open("https://example.com/a").await.unwrap();
        for locator in ["a.off", "a.js"] {
            let el = b.query(locator).unwrap().remove(0);
            assert!(!b.click(&el).await.unwrap(), "{locator}");
        }
        assert_eq!(b.navigations(), 1);
    }
}
