//! Lazily pulled, fixed-size chunk stream over an upstream response.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, stream};
use tracing::debug;

use super::{ProxyError, SessionStage};

/// Tracks one download session from validation until its upstream is
/// released. Dropping the lease is the release; it happens exactly once.
pub(crate) struct SessionLease {
    url: String,
    stage: SessionStage,
    bytes_streamed: u64,
    active: Arc<AtomicUsize>,
}

impl SessionLease {
    pub(crate) fn open(url: &str, active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        debug!(url, stage = %SessionStage::Validating, "download session opened");
        Self {
            url: url.to_string(),
            stage: SessionStage::Validating,
            bytes_streamed: 0,
            active,
        }
    }

    pub(crate) fn advance(&mut self, stage: SessionStage) {
        debug!(url = %self.url, from = %self.stage, to = %stage, "download session stage");
        self.stage = stage;
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        debug!(
            url = %self.url,
            last_stage = %self.stage,
            to = %SessionStage::Closed,
            bytes = self.bytes_streamed,
            "download session closed; upstream released"
        );
    }
}

struct Upstream {
    response: reqwest::Response,
    lease: SessionLease,
}

struct ChunkState {
    upstream: Option<Upstream>,
    buffer: BytesMut,
    chunk_size: usize,
    url: String,
}

impl ChunkState {
    /// Releases the upstream connection (and the session with it).
    fn release(&mut self) {
        self.upstream = None;
    }
}

/// Body of a proxied download.
///
/// Yields chunks of at most `chunk_size` bytes; each chunk is read from
/// upstream only when polled. The upstream connection is released when the
/// body ends, when an error is yielded, or when the stream is dropped early.
pub struct DownloadStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, ProxyError>> + Send>>,
}

impl std::fmt::Debug for DownloadStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadStream").finish_non_exhaustive()
    }
}

impl DownloadStream {
    pub(crate) fn new(
        response: reqwest::Response,
        lease: SessionLease,
        chunk_size: usize,
        url: &str,
    ) -> Self {
        let chunk_size = chunk_size.max(1);
        let state = ChunkState {
            upstream: Some(Upstream { response, lease }),
            buffer: BytesMut::with_capacity(chunk_size),
            chunk_size,
            url: url.to_string(),
        };
        Self {
            inner: Box::pin(stream::unfold(state, next_chunk)),
        }
    }
}

impl Stream for DownloadStream {
    type Item = Result<Bytes, ProxyError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

async fn next_chunk(mut state: ChunkState) -> Option<(Result<Bytes, ProxyError>, ChunkState)> {
    loop {
        if state.buffer.len() >= state.chunk_size {
            let chunk = state.buffer.split_to(state.chunk_size).freeze();
            return Some((Ok(chunk), state));
        }

        let pulled = match state.upstream.as_mut() {
            Some(upstream) => upstream.response.chunk().await,
            None if state.buffer.is_empty() => return None,
            None => {
                let rest = state.buffer.split().freeze();
                return Some((Ok(rest), state));
            }
        };

        match pulled {
            Ok(Some(bytes)) => {
                if let Some(upstream) = state.upstream.as_mut() {
                    upstream.lease.bytes_streamed += bytes.len() as u64;
                }
                state.buffer.extend_from_slice(&bytes);
            }
            Ok(None) => state.release(),
            Err(error) => {
                state.buffer.clear();
                let error = ProxyError::transport(&state.url, SessionStage::Streaming, error);
                state.release();
                return Some((Err(error), state));
            }
        }
    }
}
