//! Advisory content-type probing via metadata-only requests.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use tracing::{debug, instrument};

use crate::config::{CONNECT_TIMEOUT_SECS, CONTENT_PROBE_TIMEOUT_SECS};
use crate::http_client::{ClientBuildError, build_http_client};
use crate::user_agent::BROWSER_USER_AGENT;

/// Issues HEAD requests to learn a URL's declared media type.
///
/// The result is advisory: every failure collapses to `None`.
#[derive(Debug, Clone)]
pub struct ContentTypeProber {
    client: Client,
    timeout: Duration,
}

impl ContentTypeProber {
    /// Creates a prober with the default 10 second budget.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::with_timeouts(
            Duration::from_secs(CONTENT_PROBE_TIMEOUT_SECS),
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
        )
    }

    /// Creates a prober with explicit probe and connect timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the HTTP client cannot be built.
    pub fn with_timeouts(
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, ClientBuildError> {
        let client = build_http_client("content-prober", BROWSER_USER_AGENT, connect_timeout)?;
        Ok(Self { client, timeout })
    }

    /// Returns the lowercased media type (parameters stripped), or `None`.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn probe(&self, url: &str) -> Option<String> {
        match self.client.head(url).timeout(self.timeout).send().await {
            Ok(response) => {
                let media_type = media_type_from_headers(response.headers());
                debug!(
                    status = response.status().as_u16(),
                    content_type = media_type.as_deref().unwrap_or(""),
                    "content-type probe finished"
                );
                media_type
            }
            Err(error) => {
                debug!(error = %error, timeout = error.is_timeout(), "content-type probe failed");
                None
            }
        }
    }
}

/// Reads `Content-Type` from `headers` and normalizes it.
#[must_use]
pub fn media_type_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(normalize_media_type)
}

/// Strips parameters (`; charset=...`) and lowercases; empty becomes `None`.
#[must_use]
pub fn normalize_media_type(raw: &str) -> Option<String> {
    let essence = raw.split(';').next().unwrap_or_default().trim();
    (!essence.is_empty()).then(|| essence.to_ascii_lowercase())
}
