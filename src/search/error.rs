//! Error types for search backends.

use thiserror::Error;

/// Failures a search backend can report.
///
/// None of these ever abort discovery; they are logged and treated as an
/// empty result set.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Connection-level failure talking to the backend.
    #[error("search backend {backend} unreachable: {source}")]
    Network {
        /// Backend name.
        backend: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The backend did not answer within the configured budget.
    #[error("search backend {backend} timed out")]
    Timeout {
        /// Backend name.
        backend: String,
    },

    /// The backend answered with an error status.
    #[error("search backend {backend} returned HTTP {status}")]
    HttpStatus {
        /// Backend name.
        backend: String,
        /// HTTP status code.
        status: u16,
    },

    /// The backend response could not be interpreted.
    #[error("search backend {backend} returned an unreadable response: {reason}")]
    Parse {
        /// Backend name.
        backend: String,
        /// What went wrong.
        reason: String,
    },
}

impl SearchError {
    /// Classifies a reqwest error as timeout or network failure.
    pub fn from_transport(backend: impl Into<String>, source: reqwest::Error) -> Self {
        let backend = backend.into();
        if source.is_timeout() {
            Self::Timeout { backend }
        } else {
            Self::Network { backend, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(backend: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            backend: backend.into(),
            status,
        }
    }

    /// Creates a parse error.
    pub fn parse(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            backend: backend.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_error_http_status_display() {
        let error = SearchError::http_status("duckduckgo", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "Expected status in: {msg}");
        assert!(msg.contains("duckduckgo"), "Expected backend in: {msg}");
    }

    #[test]
    fn test_search_error_parse_display() {
        let error = SearchError::parse("duckduckgo", "missing results container");
        assert!(error.to_string().contains("missing results container"));
    }
}
