//! Shared helpers for integration tests: a scripted search backend and
//! fast-timeout pipeline builders.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use filefinder_core::{
    CandidatePipeline, ContentTypeProber, PageLinkExtractor, SearchError, SearchHit,
    SearchProvider,
};

/// Search backend that returns a fixed list of hits (or a fixed failure)
/// and records the last query it saw.
pub struct StubProvider {
    hits: Vec<SearchHit>,
    fail_with_status: Option<u16>,
    calls: AtomicUsize,
    last_query: std::sync::Mutex<Option<String>>,
}

impl StubProvider {
    pub fn with_hits(hits: Vec<SearchHit>) -> Arc<Self> {
        Arc::new(Self {
            hits,
            fail_with_status: None,
            calls: AtomicUsize::new(0),
            last_query: std::sync::Mutex::new(None),
        })
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            hits: Vec::new(),
            fail_with_status: Some(status),
            calls: AtomicUsize::new(0),
            last_query: std::sync::Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<String> {
        self.last_query.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl SearchProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_query.lock() {
            *guard = Some(query.to_string());
        }
        if let Some(status) = self.fail_with_status {
            return Err(SearchError::http_status("stub", status));
        }
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }
}

/// Pipeline with short timeouts so failure-path tests stay fast.
pub fn fast_pipeline(provider: Arc<dyn SearchProvider>) -> CandidatePipeline {
    fast_pipeline_with_page_timeout(provider, Duration::from_secs(5))
}

pub fn fast_pipeline_with_page_timeout(
    provider: Arc<dyn SearchProvider>,
    page_timeout: Duration,
) -> CandidatePipeline {
    pipeline_with_timeouts(provider, page_timeout, Duration::from_secs(5))
}

pub fn pipeline_with_timeouts(
    provider: Arc<dyn SearchProvider>,
    page_timeout: Duration,
    head_timeout: Duration,
) -> CandidatePipeline {
    let connect = Duration::from_secs(2);
    let extractor = PageLinkExtractor::with_timeouts(page_timeout, connect)
        .expect("extractor client should build");
    let prober = ContentTypeProber::with_timeouts(head_timeout, connect)
        .expect("prober client should build");
    CandidatePipeline::from_parts(provider, extractor, prober, 4)
}
