//! The two crawl stages.
//!
//! 1. **Search** ([`search`]): harvest candidate post links for one keyword
//!    and one day from the paginated blog search results.
//! 2. **Post** ([`post`]): open each candidate in its canonical view and
//!    extract one [`PostRecord`](crate::models::PostRecord).
//!
//! Both stages drive a [`Navigator`](crate::navigator::Navigator) and read
//! their locator lists from [`Locators`](crate::config::Locators). Site
//! structure that is not a matter of configuration (hosts, endpoints, URL
//! shapes) is fixed below.

pub mod post;
pub mod search;

/// Blog search endpoint.
pub const SEARCH_ENDPOINT: &str = "https://search.naver.com/search.naver";

/// Host serving blog posts; harvested links must point here.
pub const POST_HOST: &str = "blog.naver.com";

/// Mobile host whose post pages need no frame resolution.
pub const MOBILE_POST_HOST: &str = "m.blog.naver.com";

/// Path marker of the desktop post document that the blog shell frames.
pub const POST_VIEW_MARKER: &str = "PostView";

/// Base for author profile links.
pub const PROFILE_BASE: &str = "https://blog.naver.com";
