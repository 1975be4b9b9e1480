//! Explicit configuration values for discovery and proxying.
//!
//! The library never reads ambient state: callers assemble these structs
//! (the binary does so from CLI flags and environment variables) and pass
//! them in.

use std::time::Duration;

use crate::classify::ExtensionAllowlist;

/// Default search hit budget per query.
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Default number of in-flight page fetches / probes during discovery.
pub const DEFAULT_DISCOVERY_CONCURRENCY: usize = 8;

/// Default length of the list kept by the fallback ranker.
pub const DEFAULT_RANK_LIMIT: usize = 20;

/// Connect timeout shared by every client (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Page fetch timeout for link extraction (15 seconds).
pub const PAGE_FETCH_TIMEOUT_SECS: u64 = 15;

/// Content-type probe timeout (10 seconds).
pub const CONTENT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Search backend timeout (20 seconds).
pub const SEARCH_TIMEOUT_SECS: u64 = 20;

/// Download proxy metadata probe timeout (30 seconds).
pub const PROXY_PROBE_TIMEOUT_SECS: u64 = 30;

/// Download proxy streaming timeout (5 minutes for large files).
pub const PROXY_STREAM_TIMEOUT_SECS: u64 = 300;

/// Most bytes of a page body read for link extraction (2 MiB).
pub const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

/// Size of each chunk handed to the proxy's caller (64 KiB).
pub const PROXY_CHUNK_SIZE: usize = 64 * 1024;

/// Configuration for the candidate discovery pipeline.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Extensions considered "direct files".
    pub allowed_extensions: ExtensionAllowlist,
    /// Number of search hits requested from the backend.
    pub max_results: usize,
    /// Upper bound on concurrent page fetches and probes within one run.
    pub concurrency: usize,
    /// Truncation applied by the deterministic fallback ranker.
    pub rank_limit: usize,
    /// Timeout for fetching a result page.
    pub page_timeout: Duration,
    /// Timeout for a content-type probe.
    pub probe_timeout: Duration,
    /// Timeout for one search backend query.
    pub search_timeout: Duration,
    /// Connect timeout for all discovery clients.
    pub connect_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: ExtensionAllowlist::default(),
            max_results: DEFAULT_MAX_RESULTS,
            concurrency: DEFAULT_DISCOVERY_CONCURRENCY,
            rank_limit: DEFAULT_RANK_LIMIT,
            page_timeout: Duration::from_secs(PAGE_FETCH_TIMEOUT_SECS),
            probe_timeout: Duration::from_secs(CONTENT_PROBE_TIMEOUT_SECS),
            search_timeout: Duration::from_secs(SEARCH_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Configuration for the download proxy.
#[derive(Debug, Clone, Copy)]
pub struct ProxyConfig {
    /// Budget for the metadata-only request.
    pub probe_timeout: Duration,
    /// Budget for the full-body GET.
    pub stream_timeout: Duration,
    /// Connect timeout for upstream connections.
    pub connect_timeout: Duration,
    /// Size of the chunks yielded to the caller.
    pub chunk_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(PROXY_PROBE_TIMEOUT_SECS),
            stream_timeout: Duration::from_secs(PROXY_STREAM_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            chunk_size: PROXY_CHUNK_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_config_defaults() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.max_results, 10);
        assert_eq!(config.rank_limit, 20);
        assert_eq!(config.page_timeout, Duration::from_secs(15));
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert!(config.allowed_extensions.contains("pdf"));
    }

    #[test]
    fn test_proxy_config_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.probe_timeout, Duration::from_secs(30));
        assert_eq!(config.stream_timeout, Duration::from_secs(300));
        assert_eq!(config.chunk_size, 65_536);
    }
}
