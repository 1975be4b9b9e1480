//! Optional query enrichment and result ranking.
//!
//! The pipeline's correctness never depends on this capability: every
//! implementation is infallible from the caller's point of view and
//! [`FallbackAssistant`] provides deterministic behaviour when no language
//! model is configured.

mod openai;

pub use openai::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, OpenAiAssistant};

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::classify::ExtensionAllowlist;
use crate::config::DEFAULT_RANK_LIMIT;
use crate::pipeline::Candidate;

/// Keywords used when no assistant is available.
pub const FALLBACK_KEYWORDS: &[&str] = &["download", "direct link"];

/// Keywords used when an assistant answered but suggested nothing usable.
pub const EMPTY_REPLY_KEYWORDS: &[&str] = &["download", "file", "direct link"];

/// Most keywords accepted from an assistant.
pub const MAX_KEYWORDS: usize = 4;

/// Most candidates an assistant may return from ranking.
pub const MAX_RANKED: usize = 50;

/// Extra search terms and the extension subset to look for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    /// Terms appended to the user's query.
    pub keywords: Vec<String>,
    /// Extensions to classify against; always a subset of the allowlist.
    pub extensions: ExtensionAllowlist,
}

impl Enrichment {
    /// The deterministic enrichment used when no assistant is available.
    #[must_use]
    pub fn fallback(allowed: &ExtensionAllowlist) -> Self {
        Self {
            keywords: FALLBACK_KEYWORDS.iter().map(ToString::to_string).collect(),
            extensions: allowed.clone(),
        }
    }
}

/// Enrichment and ranking capability injected into the finder.
#[async_trait]
pub trait QueryAssistant: Send + Sync {
    /// Assistant name for logging.
    fn name(&self) -> &str;

    /// Suggests extra keywords and an extension subset for `query`.
    async fn enrich(&self, query: &str, allowed: &ExtensionAllowlist) -> Enrichment;

    /// Reorders (and may truncate) `candidates` by relevance. Must not invent
    /// URLs or alter records.
    async fn rank(&self, query: &str, candidates: Vec<Candidate>) -> Vec<Candidate>;
}

/// Deterministic assistant: fixed keywords, order-preserving ranking.
#[derive(Debug, Clone, Copy)]
pub struct FallbackAssistant {
    rank_limit: usize,
}

impl FallbackAssistant {
    /// Creates a fallback assistant that keeps the first `rank_limit` results.
    #[must_use]
    pub fn new(rank_limit: usize) -> Self {
        Self { rank_limit }
    }
}

impl Default for FallbackAssistant {
    fn default() -> Self {
        Self::new(DEFAULT_RANK_LIMIT)
    }
}

#[async_trait]
impl QueryAssistant for FallbackAssistant {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn enrich(&self, _query: &str, allowed: &ExtensionAllowlist) -> Enrichment {
        Enrichment::fallback(allowed)
    }

    async fn rank(&self, _query: &str, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.truncate(self.rank_limit);
        candidates
    }
}

/// Maps a ranking reply back onto the original records.
///
/// Entries whose `direct_url` was not among `originals` are discarded,
/// repeats are removed, and the original record is returned for every
/// surviving URL so no field can be lost or rewritten. Capped at
/// [`MAX_RANKED`].
#[must_use]
pub fn reconcile_ranking<I>(originals: &[Candidate], ranked_urls: I) -> Vec<Candidate>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let by_url: HashMap<&str, &Candidate> = originals
        .iter()
        .map(|candidate| (candidate.direct_url.as_str(), candidate))
        .collect();
    let mut seen = HashSet::new();
    ranked_urls
        .into_iter()
        .filter_map(|url| by_url.get(url.as_ref()).copied())
        .filter(|candidate| seen.insert(candidate.direct_url.as_str()))
        .take(MAX_RANKED)
        .cloned()
        .collect()
}
