//! Candidate discovery: search hits in, deduplicated direct-file URLs out.
//!
//! One [`CandidatePipeline::discover`] run:
//!
//! 1. appends the extra terms to the query and asks the [`SearchProvider`];
//! 2. **phase A** keeps hits whose own URL is a direct file
//!    ([`CandidateReason::MatchedResult`]);
//! 3. **phase B** crawls every `http(s)` hit's page and keeps classified
//!    links ([`CandidateReason::FoundOnPage`]);
//! 4. deduplicates phase A then phase B by `direct_url`, first occurrence wins;
//! 5. probes each surviving candidate's content type (advisory).
//!
//! Page fetches and probes run concurrently, bounded by
//! [`DiscoveryConfig::concurrency`], with results reassembled in input order.
//! A failure only ever affects the hit it belongs to.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::classify::{ExtensionAllowlist, has_http_scheme, is_direct_file};
use crate::config::DiscoveryConfig;
use crate::extract::PageLinkExtractor;
use crate::http_client::ClientBuildError;
use crate::probe::ContentTypeProber;
use crate::search::{SearchHit, SearchProvider};

/// Why a URL became a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateReason {
    /// The search hit itself points at a file.
    MatchedResult,
    /// The file was linked from the hit's page.
    FoundOnPage,
}

impl CandidateReason {
    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::MatchedResult => "Matched by extension",
            Self::FoundOnPage => "Found on page",
        }
    }
}

/// One discovered direct-file URL with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Title of the search hit that led here.
    pub title: String,
    /// The search hit's URL.
    pub source_page: String,
    /// The downloadable file URL; unique within one run.
    pub direct_url: String,
    /// How the candidate was found.
    pub reason: CandidateReason,
    /// Probed media type, or empty when probing failed.
    #[serde(default)]
    pub content_type: String,
}

impl Candidate {
    fn matched(hit: &SearchHit) -> Self {
        Self {
            title: hit.title.clone(),
            source_page: hit.href.clone(),
            direct_url: hit.href.clone(),
            reason: CandidateReason::MatchedResult,
            content_type: String::new(),
        }
    }

    fn found_on_page(hit: &SearchHit, link: String) -> Self {
        Self {
            title: hit.title.clone(),
            source_page: hit.href.clone(),
            direct_url: link,
            reason: CandidateReason::FoundOnPage,
            content_type: String::new(),
        }
    }
}

/// Builds the backend query: `query` plus space-joined `extra_terms`.
#[must_use]
pub fn enriched_query(query: &str, extra_terms: &[String]) -> String {
    let extra = extra_terms
        .iter()
        .map(|term| term.trim())
        .filter(|term| !term.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if extra.is_empty() {
        query.to_string()
    } else {
        format!("{query} {extra}")
    }
}

/// Removes later candidates whose `direct_url` was already seen, keeping
/// order. Candidates with an empty `direct_url` are dropped.
#[must_use]
pub fn dedup_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| {
            !candidate.direct_url.is_empty() && seen.insert(candidate.direct_url.clone())
        })
        .collect()
}

/// Orchestrates search, classification, crawling, dedup and probing.
#[derive(Clone)]
pub struct CandidatePipeline {
    provider: Arc<dyn SearchProvider>,
    extractor: PageLinkExtractor,
    prober: ContentTypeProber,
    concurrency: usize,
}

impl std::fmt::Debug for CandidatePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidatePipeline")
            .field("provider", &self.provider.name())
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl CandidatePipeline {
    /// Creates a pipeline whose fetchers honour the timeouts in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if an HTTP client cannot be built.
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        config: &DiscoveryConfig,
    ) -> Result<Self, ClientBuildError> {
        let extractor =
            PageLinkExtractor::with_timeouts(config.page_timeout, config.connect_timeout)?;
        let prober =
            ContentTypeProber::with_timeouts(config.probe_timeout, config.connect_timeout)?;
        Ok(Self::from_parts(provider, extractor, prober, config.concurrency))
    }

    /// Assembles a pipeline from already-built components.
    #[must_use]
    pub fn from_parts(
        provider: Arc<dyn SearchProvider>,
        extractor: PageLinkExtractor,
        prober: ContentTypeProber,
        concurrency: usize,
    ) -> Self {
        Self {
            provider,
            extractor,
            prober,
            concurrency: concurrency.max(1),
        }
    }

    /// Runs one discovery pass. Never fails: backend errors yield an empty
    /// list and per-hit failures only drop that hit's contribution.
    #[instrument(skip(self, extra_terms, allowed), fields(backend = self.provider.name()))]
    pub async fn discover(
        &self,
        query: &str,
        extra_terms: &[String],
        allowed: &ExtensionAllowlist,
        max_results: usize,
    ) -> Vec<Candidate> {
        let search_query = enriched_query(query, extra_terms);
        let hits = match self.provider.search(&search_query, max_results).await {
            Ok(hits) => hits,
            Err(error) => {
                warn!(error = %error, "search backend failed; treating as zero hits");
                Vec::new()
            }
        };
        debug!(hits = hits.len(), query = %search_query, "search hits received");
        if hits.is_empty() {
            return Vec::new();
        }

        let phase_a: Vec<Candidate> = hits
            .iter()
            .filter(|hit| is_direct_file(&hit.href, allowed))
            .map(Candidate::matched)
            .collect();

        let phase_b = self.collect_page_candidates(&hits, allowed).await;
        debug!(
            matched = phase_a.len(),
            found_on_page = phase_b.len(),
            "classification finished"
        );

        let mut candidates = dedup_candidates(phase_a.into_iter().chain(phase_b).collect());
        self.annotate_content_types(&mut candidates).await;

        info!(candidates = candidates.len(), "discovery complete");
        candidates
    }

    async fn collect_page_candidates(
        &self,
        hits: &[SearchHit],
        allowed: &ExtensionAllowlist,
    ) -> Vec<Candidate> {
        let crawlable: Vec<SearchHit> = hits
            .iter()
            .filter(|hit| has_http_scheme(&hit.href))
            .cloned()
            .collect();
        let per_hit: Vec<Vec<Candidate>> = stream::iter(crawlable)
            .map(|hit| async move {
                self.extractor
                    .extract_links(&hit.href)
                    .await
                    .into_iter()
                    .filter(|link| is_direct_file(link, allowed))
                    .map(|link| Candidate::found_on_page(&hit, link))
                    .collect::<Vec<_>>()
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        per_hit.into_iter().flatten().collect()
    }

    async fn annotate_content_types(&self, candidates: &mut [Candidate]) {
        let urls: Vec<String> = candidates
            .iter()
            .map(|candidate| candidate.direct_url.clone())
            .collect();
        let probed: Vec<Option<String>> = stream::iter(urls)
            .map(|url| async move { self.prober.probe(&url).await })
            .buffered(self.concurrency)
            .collect()
            .await;

        for (candidate, content_type) in candidates.iter_mut().zip(probed) {
            candidate.content_type = content_type.unwrap_or_default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(url: &str, reason: CandidateReason) -> Candidate {
        Candidate {
            title: format!("title for {url}"),
            source_page: "https://example.org/page".to_string(),
            direct_url: url.to_string(),
            reason,
            content_type: String::new(),
        }
    }

    #[test]
    fn test_enriched_query_appends_terms() {
        let terms = vec!["download".to_string(), "direct link".to_string()];
        assert_eq!(
            enriched_query("operating systems", &terms),
            "operating systems download direct link"
        );
    }

    #[test]
    fn test_enriched_query_without_terms_is_unchanged() {
        assert_eq!(enriched_query("rust book", &[]), "rust book");
        assert_eq!(enriched_query("rust book", &[" ".to_string()]), "rust book");
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_in_order() {
        let a = candidate("https://x.org/a.pdf", CandidateReason::MatchedResult);
        let b = candidate("https://x.org/b.pdf", CandidateReason::FoundOnPage);
        let mut a_dup = candidate("https://x.org/a.pdf", CandidateReason::FoundOnPage);
        a_dup.title = "duplicate".to_string();
        let c = candidate("https://x.org/c.pdf", CandidateReason::FoundOnPage);

        let out = dedup_candidates(vec![a.clone(), b.clone(), a_dup, c.clone()]);
        assert_eq!(out, vec![a, b, c]);
    }

    #[test]
    fn test_dedup_prefers_matched_result_over_page_hit() {
        let direct = candidate("https://x.org/a.pdf", CandidateReason::MatchedResult);
        let page = candidate("https://x.org/a.pdf", CandidateReason::FoundOnPage);
        let out = dedup_candidates(vec![direct, page]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].reason, CandidateReason::MatchedResult);
    }

    #[test]
    fn test_dedup_drops_empty_urls() {
        let out = dedup_candidates(vec![candidate("", CandidateReason::FoundOnPage)]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_candidate_reason_serializes_snake_case() {
        let json = serde_json::to_string(&CandidateReason::FoundOnPage).unwrap_or_default();
        assert_eq!(json, "\"found_on_page\"");
    }
}
