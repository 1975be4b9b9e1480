//! Best-effort hyperlink extraction from HTML pages.
//!
//! [`PageLinkExtractor::extract_links`] never fails: network errors, timeouts,
//! error statuses, non-HTML responses and unreadable bodies all yield an
//! empty list. At most [`MAX_PAGE_BYTES`] of a body are read; links past the
//! cap are not seen.
//!
//! # Link resolution
//!
//! Only three href forms are resolved:
//! - absolute `http://` / `https://` links are kept as-is;
//! - scheme-relative `//host/path` links get an `https:` prefix;
//! - root-relative `/path` links are joined onto the page's origin.
//!
//! Every other relative form (`file.pdf`, `../file.pdf`, `?q=1`) is dropped.

use std::time::Duration;

use reqwest::{Client, Response};
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use crate::config::{CONNECT_TIMEOUT_SECS, MAX_PAGE_BYTES, PAGE_FETCH_TIMEOUT_SECS};
use crate::http_client::{ClientBuildError, build_http_client};
use crate::probe::media_type_from_headers;
use crate::user_agent::BROWSER_USER_AGENT;

/// Fetches pages and returns the absolute targets of their `<a href>` anchors.
#[derive(Debug, Clone)]
pub struct PageLinkExtractor {
    client: Client,
    timeout: Duration,
    max_page_bytes: usize,
}

impl PageLinkExtractor {
    /// Creates an extractor with the default 15 second page budget.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::with_timeouts(
            Duration::from_secs(PAGE_FETCH_TIMEOUT_SECS),
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
        )
    }

    /// Creates an extractor with explicit page and connect timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the HTTP client cannot be built.
    pub fn with_timeouts(
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, ClientBuildError> {
        let client = build_http_client("page-extractor", BROWSER_USER_AGENT, connect_timeout)?;
        Ok(Self {
            client,
            timeout,
            max_page_bytes: MAX_PAGE_BYTES,
        })
    }

    /// Overrides the body size cap.
    #[must_use]
    pub fn with_max_page_bytes(mut self, max_page_bytes: usize) -> Self {
        self.max_page_bytes = max_page_bytes;
        self
    }

    /// Fetches `page_url` and returns every resolvable anchor target, in
    /// document order, duplicates included.
    #[instrument(skip(self), fields(url = %page_url))]
    pub async fn extract_links(&self, page_url: &str) -> Vec<String> {
        let Ok(base) = Url::parse(page_url) else {
            debug!("page URL does not parse; skipping extraction");
            return Vec::new();
        };

        let response = match self
            .client
            .get(base.as_str())
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                debug!(error = %error, timeout = error.is_timeout(), "page fetch failed");
                return Vec::new();
            }
        };

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            debug!(status = status.as_u16(), "page fetch returned error status");
            return Vec::new();
        }

        if let Some(media_type) = media_type_from_headers(response.headers())
            && !is_html_media_type(&media_type)
        {
            debug!(%media_type, "page is not HTML; skipping extraction");
            return Vec::new();
        }

        let body = match read_capped_body(response, self.max_page_bytes).await {
            Ok(body) => body,
            Err(error) => {
                debug!(error = %error, "page body could not be read");
                return Vec::new();
            }
        };

        let links = parse_anchor_links(&body, &base);
        debug!(links = links.len(), "extracted page links");
        links
    }
}

/// A missing Content-Type is treated as HTML; the body cap still applies.
fn is_html_media_type(media_type: &str) -> bool {
    matches!(media_type, "text/html" | "application/xhtml+xml")
}

/// Reads at most `limit` bytes of the body, decoding lossily as UTF-8.
async fn read_capped_body(
    mut response: Response,
    limit: usize,
) -> Result<String, reqwest::Error> {
    let mut body: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit.saturating_sub(body.len());
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            debug!(limit, "page body truncated at size cap");
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Parses `html` and resolves each `<a href>` against `page_url`.
///
/// Kept synchronous: `scraper::Html` is not `Send` and must not live across
/// an `.await`.
#[must_use]
pub fn parse_anchor_links(html: &str, page_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| absolutize_href(href, page_url))
        .collect()
}

/// Resolves one href using the three supported forms; `None` means dropped.
#[must_use]
pub fn absolutize_href(href: &str, page_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    if href.starts_with("//") {
        return Some(format!("https:{href}"));
    }
    if href.starts_with('/') {
        return page_url.join(href).ok().map(|url| url.to_string());
    }
    None
}
