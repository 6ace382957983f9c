//! The document capability the crawler drives.
//!
//! [`Browser`] is the boundary between the crawl logic and whatever actually
//! loads pages: open a URL, report readiness, scroll, query by CSS locator,
//! read text and attributes, click. Every operation is fallible; callers
//! decide whether a failure is soft.
//!
//! Query results are owned [`Element`] snapshots rather than live handles, so
//! they stay valid after the browser moves on to another page. A snapshot can
//! still be searched for descendants with [`Element::select`].
//!
//! The crate ships one implementation, [`StaticBrowser`], which renders
//! documents from fetched HTML.

pub mod static_page;

#[cfg(test)]
pub mod fixture;

pub use static_page::{HttpSource, StaticBrowser};

use crate::error::{CrawlError, Result};
use crate::utils::clean_text;
use scraper::{ElementRef, Html, Selector};

/// Scroll targets understood by [`Browser::scroll`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scroll {
    /// Scroll down by this fraction of the document height.
    By(f32),
    Top,
    Bottom,
}

/// Owned snapshot of a rendered element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    /// Visible text with whitespace collapsed.
    pub text: String,
    attrs: Vec<(String, String)>,
    html: String,
}

impl Element {
    pub fn from_ref(el: ElementRef<'_>) -> Self {
        Self {
            tag: el.value().name().to_string(),
            text: rendered_text(el),
            attrs: el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            html: el.html(),
        }
    }

    /// Attribute value, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First attribute among `names` with a non-blank value.
    pub fn first_attr<S: AsRef<str>>(&self, names: &[S]) -> Option<&str> {
        names
            .iter()
            .filter_map(|n| self.attr(n.as_ref()))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    /// Elements matching `locator` inside this element, in document order.
    pub fn select(&self, locator: &str) -> Result<Vec<Element>> {
        let selector = parse_locator(locator)?;
        let fragment = Html::parse_fragment(&self.html);
        Ok(fragment.select(&selector).map(Element::from_ref).collect())
    }
}

/// An element whose own text contained a searched-for needle.
#[derive(Debug, Clone, PartialEq)]
pub struct TextHit {
    /// Collapsed own text of the element.
    pub text: String,
    /// Collapsed text of the next few sibling elements.
    pub following: Vec<String>,
}

/// Whether the content of `el` shows up on the page at all.
pub fn is_rendered(el: ElementRef<'_>) -> bool {
    !matches!(el.value().name(), "script" | "style" | "noscript")
}

/// Visible text of `el` and its descendants, whitespace collapsed.
/// Script, style and noscript content is left out.
pub fn rendered_text(el: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_text(el, &mut parts);
    clean_text(&parts.join(" "))
}

fn collect_text<'a>(el: ElementRef<'a>, out: &mut Vec<&'a str>) {
    if !is_rendered(el) {
        return;
    }
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push(&**text);
        } else if let Some(child) = ElementRef::wrap(child) {
            collect_text(child, out);
        }
    }
}

/// Compile a CSS locator.
pub fn parse_locator(locator: &str) -> Result<Selector> {
    Selector::parse(locator).map_err(|_| CrawlError::Locator(locator.to_string()))
}

/// A page-loading capability.
pub trait Browser {
    /// Load `url`, replacing the current document.
    async fn open(&mut self, url: &str) -> Result<()>;

    /// Whether the current document has finished loading.
    fn is_ready(&self) -> bool;

    /// Location of the current document after redirects.
    fn current_url(&self) -> Option<&str>;

    /// Raw source of the current document.
    fn page_source(&self) -> Option<&str>;

    async fn scroll(&mut self, to: Scroll) -> Result<()>;

    /// All elements matching `locator`, in document order.
    fn query(&self, locator: &str) -> Result<Vec<Element>>;

    /// Elements whose own text contains `needle`, with up to `siblings`
    /// following sibling texts each. Script and style content is ignored.
    fn find_text(&self, needle: &str, siblings: usize) -> Result<Vec<TextHit>>;

    /// Activate `element`. Returns `false` when it leads nowhere.
    async fn click(&mut self, element: &Element) -> Result<bool>;

    /// Whether the document can change without a new navigation (script
    /// rendering, lazy loading). Waits on a non-dynamic document check once.
    fn renders_dynamically(&self) -> bool {
        true
    }
}
