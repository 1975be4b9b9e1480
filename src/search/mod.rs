//! Web search adapters.
//!
//! - [`SearchProvider`] - Async trait implemented by search backends
//! - [`SearchHit`] - One raw result tuple (title, URL, snippet)
//! - [`DuckDuckGoProvider`] - Adapter for the DuckDuckGo HTML endpoint
//!
//! Providers may fail; the candidate pipeline treats any [`SearchError`]
//! exactly like a query with zero hits.

mod duckduckgo;
mod error;

pub use duckduckgo::{DEFAULT_DUCKDUCKGO_URL, DuckDuckGoProvider, parse_result_page};
pub use error::SearchError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One search backend result, in backend relevance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result title as shown by the backend.
    pub title: String,
    /// Result target URL.
    pub href: String,
    /// Short text excerpt.
    pub snippet: String,
}

impl SearchHit {
    /// Creates a new hit.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        href: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
            snippet: snippet.into(),
        }
    }
}

/// A text search backend.
///
/// Uses `async_trait` so the pipeline can hold `Arc<dyn SearchProvider>`.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Runs `query`, asking for at most `max_results` hits. Backends may
    /// return fewer.
    async fn search(&self, query: &str, max_results: usize)
    -> Result<Vec<SearchHit>, SearchError>;
}
