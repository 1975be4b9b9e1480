//! Streaming download proxy.
//!
//! A session walks `Validating → ProbingMetadata → Streaming → Closed`:
//!
//! - **Validating** rejects anything that is not an `http(s)` URL.
//! - **ProbingMetadata** sends a HEAD request (redirects followed, 30s budget)
//!   to fail fast on error statuses and learn the media type.
//! - **Streaming** issues an independent GET (300s budget) and exposes the body
//!   as a lazily pulled [`DownloadStream`] of 64 KiB chunks.
//! - **Closed** is reached from every state; the upstream connection is
//!   released exactly once, including when the caller drops the body early.
//!
//! # Example
//!
//! ```no_run
//! use filefinder_core::proxy::DownloadProxy;
//! use futures_util::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let proxy = DownloadProxy::new()?;
//! let download = proxy.open_download("https://example.com/report.pdf").await?;
//! println!("{}", download.content_disposition());
//! let mut body = download.body;
//! while let Some(chunk) = body.next().await {
//!     let _bytes = chunk?;
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod stream;

pub use error::ProxyError;
pub use stream::DownloadStream;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument};
use url::Url;

use crate::classify::has_http_scheme;
use crate::config::ProxyConfig;
use crate::http_client::{ClientBuildError, build_http_client};
use crate::probe::media_type_from_headers;
use crate::user_agent::BROWSER_USER_AGENT;

use stream::SessionLease;

/// Media type used when upstream declares none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Filename used when the URL has no usable last path segment.
pub const DEFAULT_DISPOSITION_NAME: &str = "download";

/// Lifecycle phase of one download session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    /// Checking the URL.
    Validating,
    /// Waiting on the metadata-only request.
    ProbingMetadata,
    /// Relaying the GET body.
    Streaming,
    /// Upstream released.
    Closed,
}

impl std::fmt::Display for SessionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Validating => "validating",
            Self::ProbingMetadata => "probing_metadata",
            Self::Streaming => "streaming",
            Self::Closed => "closed",
        })
    }
}

/// An open proxied download: negotiated metadata plus the body stream.
#[derive(Debug)]
pub struct ProxiedDownload {
    /// The upstream URL as requested.
    pub url: String,
    /// Media type from the metadata probe, parameters stripped.
    pub content_type: String,
    /// Filename for the `Content-Disposition` header.
    pub disposition_name: String,
    /// The body; dropping it releases the upstream connection.
    pub body: DownloadStream,
}

impl ProxiedDownload {
    /// `Content-Disposition` header value for this download.
    #[must_use]
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.disposition_name)
    }
}

/// Validates, probes and streams upstream files.
///
/// Cheap to clone; clones share the client's connection pool and the
/// active-session counter.
#[derive(Debug, Clone)]
pub struct DownloadProxy {
    client: Client,
    config: ProxyConfig,
    active: Arc<AtomicUsize>,
}

impl DownloadProxy {
    /// Creates a proxy with default timeouts and chunk size.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::with_config(ProxyConfig::default())
    }

    /// Creates a proxy with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the HTTP client cannot be built.
    pub fn with_config(config: ProxyConfig) -> Result<Self, ClientBuildError> {
        let client =
            build_http_client("download-proxy", BROWSER_USER_AGENT, config.connect_timeout)?;
        Ok(Self {
            client,
            config,
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of sessions that have not yet released their upstream.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Opens a proxied download for `url`.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::InvalidInput`] for malformed or non-`http(s)` URLs
    /// - [`ProxyError::UpstreamStatus`] when the HEAD or GET returns >= 400
    /// - [`ProxyError::Timeout`] / [`ProxyError::Network`] on transport failure
    #[instrument(skip(self), fields(url = %url))]
    pub async fn open_download(&self, url: &str) -> Result<ProxiedDownload, ProxyError> {
        let mut lease = SessionLease::open(url, Arc::clone(&self.active));

        let target = validate_download_url(url)?;

        lease.advance(SessionStage::ProbingMetadata);
        let head = self
            .client
            .head(target.as_str())
            .timeout(self.config.probe_timeout)
            .send()
            .await
            .map_err(|e| ProxyError::transport(url, SessionStage::ProbingMetadata, e))?;
        let status = head.status().as_u16();
        if status >= 400 {
            return Err(ProxyError::upstream_status(url, status, SessionStage::ProbingMetadata));
        }
        let content_type = media_type_from_headers(head.headers())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        drop(head);
        let disposition_name = disposition_name(&target);

        lease.advance(SessionStage::Streaming);
        let response = self
            .client
            .get(target.as_str())
            .timeout(self.config.stream_timeout)
            .send()
            .await
            .map_err(|e| ProxyError::transport(url, SessionStage::Streaming, e))?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(ProxyError::upstream_status(url, status, SessionStage::Streaming));
        }

        info!(%content_type, filename = %disposition_name, "streaming download");
        Ok(ProxiedDownload {
            url: url.to_string(),
            content_type,
            disposition_name,
            body: DownloadStream::new(response, lease, self.config.chunk_size, url),
        })
    }
}

/// Parses `url` and accepts only `http`/`https`.
///
/// # Errors
///
/// Returns [`ProxyError::InvalidInput`] otherwise.
pub fn validate_download_url(url: &str) -> Result<Url, ProxyError> {
    if !has_http_scheme(url) {
        return Err(ProxyError::invalid_input(url, "only http and https URLs can be downloaded"));
    }
    let parsed = Url::parse(url.trim())
        .map_err(|_| ProxyError::invalid_input(url, "URL could not be parsed"))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ProxyError::invalid_input(url, "URL has no host"));
    }
    Ok(parsed)
}

/// Last path segment without the query string, or
/// [`DEFAULT_DISPOSITION_NAME`] when empty.
///
/// The segment stays percent-encoded and quotes, backslashes and control
/// characters are replaced, so the result is always safe inside a quoted
/// header parameter.
#[must_use]
pub fn disposition_name(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let name: String = segment
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if name.is_empty() {
        DEFAULT_DISPOSITION_NAME.to_string()
    } else {
        name
    }
}
