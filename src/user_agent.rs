//! Shared User-Agent strings for crawling, probing and proxy traffic.
//!
//! Page fetches present a realistic browser identity because many landing
//! pages reject unidentified clients. Everything else identifies the tool.

/// Browser User-Agent sent when fetching HTML pages and probing file URLs.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Default User-Agent for requests that do not need to look like a browser.
#[must_use]
pub(crate) fn default_tool_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("filefinder/{version} (direct file search)")
}
