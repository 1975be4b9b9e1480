//! DuckDuckGo HTML endpoint adapter.
//!
//! Queries the JavaScript-free results page and scrapes `div.result` blocks.
//! Result links are usually wrapped in a `/l/?uddg=<target>` redirect, which
//! is unwrapped so hits point straight at the target page.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use super::{SearchError, SearchHit, SearchProvider};
use crate::config::{CONNECT_TIMEOUT_SECS, SEARCH_TIMEOUT_SECS};
use crate::http_client::{ClientBuildError, build_http_client};
use crate::user_agent::BROWSER_USER_AGENT;

/// Default DuckDuckGo HTML endpoint.
pub const DEFAULT_DUCKDUCKGO_URL: &str = "https://html.duckduckgo.com/html/";

const BACKEND_NAME: &str = "duckduckgo";

/// Search provider backed by DuckDuckGo's HTML results page.
#[derive(Debug, Clone)]
pub struct DuckDuckGoProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl DuckDuckGoProvider {
    /// Creates a provider against the public endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::with_base_url(
            DEFAULT_DUCKDUCKGO_URL,
            Duration::from_secs(SEARCH_TIMEOUT_SECS),
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
        )
    }

    /// Creates a provider with a custom endpoint (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the HTTP client cannot be built.
    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, ClientBuildError> {
        let client = build_http_client(BACKEND_NAME, BROWSER_USER_AGENT, connect_timeout)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    #[instrument(skip(self), fields(backend = BACKEND_NAME))]
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        if query.trim().is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let endpoint = Url::parse_with_params(&self.base_url, &[("q", query)])
            .map_err(|e| SearchError::parse(BACKEND_NAME, format!("bad endpoint: {e}")))?;

        let response = self
            .client
            .get(endpoint)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SearchError::from_transport(BACKEND_NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::http_status(BACKEND_NAME, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SearchError::from_transport(BACKEND_NAME, e))?;

        let mut hits = parse_result_page(&body);
        hits.truncate(max_results);
        debug!(hits = hits.len(), "search finished");
        Ok(hits)
    }
}

/// Extracts organic results from a DuckDuckGo HTML results page.
///
/// Ads and results without a usable link are skipped.
#[must_use]
pub fn parse_result_page(html: &str) -> Vec<SearchHit> {
    let (Ok(result_sel), Ok(title_sel), Ok(snippet_sel)) = (
        Selector::parse("div.result"),
        Selector::parse("a.result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&result_sel)
        .filter(|result| !result.value().classes().any(|c| c == "result--ad"))
        .filter_map(|result| {
            let anchor = result.select(&title_sel).next()?;
            let href = unwrap_redirect(anchor.value().attr("href")?)?;
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(collapse_text)
                .unwrap_or_default();
            Some(SearchHit::new(collapse_text(anchor), href, snippet))
        })
        .collect()
}

/// Turns `//duckduckgo.com/l/?uddg=<encoded>` into the encoded target.
/// Plain links are returned unchanged.
fn unwrap_redirect(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_string()
    };
    let parsed = Url::parse(&absolute).ok()?;
    if parsed.path() == "/l/" || parsed.path() == "/l" {
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned());
    }
    Some(absolute)
}

fn collapse_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
