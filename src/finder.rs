//! End-to-end file search: enrich, discover, rank.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::assist::QueryAssistant;
use crate::config::DiscoveryConfig;
use crate::pipeline::{Candidate, CandidatePipeline};

/// Route the HTTP surface serves proxied downloads from.
pub const DOWNLOAD_ROUTE: &str = "/download";

/// A ranked candidate annotated with its proxy download link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoundFile {
    /// The candidate as produced by the pipeline and ranker.
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Relative link that downloads the file through the proxy.
    pub download_href: String,
}

impl From<Candidate> for FoundFile {
    fn from(candidate: Candidate) -> Self {
        let download_href = download_href(&candidate.direct_url);
        Self {
            candidate,
            download_href,
        }
    }
}

/// Builds `/download?url=<percent-encoded url>`; `#` for an empty URL.
#[must_use]
pub fn download_href(direct_url: &str) -> String {
    if direct_url.is_empty() {
        return "#".to_string();
    }
    format!("{DOWNLOAD_ROUTE}?url={}", urlencoding::encode(direct_url))
}

/// Couples the discovery pipeline with an injected assistant.
#[derive(Clone)]
pub struct FileFinder {
    pipeline: CandidatePipeline,
    assistant: Arc<dyn QueryAssistant>,
    config: DiscoveryConfig,
}

impl std::fmt::Debug for FileFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileFinder")
            .field("pipeline", &self.pipeline)
            .field("assistant", &self.assistant.name())
            .field("config", &self.config)
            .finish()
    }
}

impl FileFinder {
    /// Creates a finder.
    #[must_use]
    pub fn new(
        pipeline: CandidatePipeline,
        assistant: Arc<dyn QueryAssistant>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            pipeline,
            assistant,
            config,
        }
    }

    /// The configuration this finder was built with.
    #[must_use]
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Finds, ranks and annotates direct-file candidates for `query`.
    ///
    /// A blank query returns an empty list without touching the network.
    #[instrument(skip(self), fields(assistant = self.assistant.name()))]
    pub async fn find(&self, query: &str) -> Vec<FoundFile> {
        let query = query.trim();
        if query.is_empty() {
            debug!("blank query; nothing to search");
            return Vec::new();
        }

        let enrichment = self
            .assistant
            .enrich(query, &self.config.allowed_extensions)
            .await;

        let candidates = self
            .pipeline
            .discover(
                query,
                &enrichment.keywords,
                &enrichment.extensions,
                self.config.max_results,
            )
            .await;
        if candidates.is_empty() {
            info!("no direct download candidates found");
            return Vec::new();
        }

        let ranked = self.assistant.rank(query, candidates).await;
        info!(results = ranked.len(), "search ranked");
        ranked.into_iter().map(FoundFile::from).collect()
    }
}
