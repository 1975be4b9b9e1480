//! Error types for the download proxy.

use thiserror::Error;

use super::SessionStage;

/// Failures surfaced by [`DownloadProxy::open_download`](super::DownloadProxy::open_download)
/// and by the body stream.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The URL is malformed or does not use `http`/`https`.
    #[error("invalid download URL {url}: {reason}")]
    InvalidInput {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Upstream answered with a status of 400 or above.
    #[error("upstream returned HTTP {status} for {url} while {stage}")]
    UpstreamStatus {
        /// The upstream URL.
        url: String,
        /// The upstream status code.
        status: u16,
        /// Which phase observed the status.
        stage: SessionStage,
    },

    /// Upstream did not answer within the phase's budget.
    #[error("timeout while {stage} {url}")]
    Timeout {
        /// The upstream URL.
        url: String,
        /// Which phase timed out.
        stage: SessionStage,
    },

    /// Connection-level failure talking to upstream.
    #[error("network error while {stage} {url}: {source}")]
    Network {
        /// The upstream URL.
        url: String,
        /// Which phase failed.
        stage: SessionStage,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },
}

impl ProxyError {
    /// Creates an invalid-input error.
    pub fn invalid_input(url: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidInput {
            url: url.into(),
            reason,
        }
    }

    /// Creates an upstream status error.
    pub fn upstream_status(url: impl Into<String>, status: u16, stage: SessionStage) -> Self {
        Self::UpstreamStatus {
            url: url.into(),
            status,
            stage,
        }
    }

    /// Classifies a reqwest error as timeout or network failure.
    pub fn transport(url: impl Into<String>, stage: SessionStage, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url, stage }
        } else {
            Self::Network { url, stage, source }
        }
    }

    /// HTTP-style status to report to the caller.
    ///
    /// Upstream error statuses are passed through; anything else maps to
    /// 400 (bad input), 504 (timeout) or 502 (bad gateway).
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput { .. } => 400,
            Self::UpstreamStatus { status, .. } if (400..=599).contains(status) => *status,
            Self::UpstreamStatus { .. } | Self::Network { .. } => 502,
            Self::Timeout { .. } => 504,
        }
    }

    /// Short machine-readable error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::UpstreamStatus { .. } => "upstream_error",
            Self::Timeout { .. } => "upstream_timeout",
            Self::Network { .. } => "upstream_unreachable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_maps_to_400() {
        let error = ProxyError::invalid_input("ftp://x/file.pdf", "unsupported scheme");
        assert_eq!(error.status_code(), 400);
        assert_eq!(error.kind(), "invalid_input");
        assert!(error.to_string().contains("ftp://x/file.pdf"));
    }

    #[test]
    fn test_upstream_status_is_preserved() {
        let error = ProxyError::upstream_status(
            "https://host/a.pdf",
            404,
            SessionStage::ProbingMetadata,
        );
        assert_eq!(error.status_code(), 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected status in: {msg}");
        assert!(msg.contains("probing_metadata"), "Expected stage in: {msg}");
    }

    #[test]
    fn test_out_of_range_upstream_status_maps_to_bad_gateway() {
        let error = ProxyError::upstream_status("https://host/a.pdf", 999, SessionStage::Streaming);
        assert_eq!(error.status_code(), 502);
    }

    #[test]
    fn test_timeout_maps_to_gateway_timeout() {
        let error = ProxyError::Timeout {
            url: "https://host/a.pdf".to_string(),
            stage: SessionStage::Streaming,
        };
        assert_eq!(error.status_code(), 504);
        assert!(error.to_string().contains("streaming"));
    }
}
