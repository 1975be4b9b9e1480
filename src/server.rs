//! Thin HTTP surface: JSON search results and the streaming download route.
//!
//! Routes:
//! - `GET /health` - liveness
//! - `GET /search?q=...` - ranked direct-file candidates as JSON
//! - `GET /download?url=...` - proxied, streamed download

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::finder::{DOWNLOAD_ROUTE, FileFinder, FoundFile};
use crate::proxy::{DownloadProxy, ProxyError};

/// Message returned alongside an empty result list.
pub const NO_RESULTS_MESSAGE: &str = "No direct download results were found. \
    Try another phrase or name the file type more specifically.";

/// Shared state for all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Search orchestration.
    pub finder: FileFinder,
    /// Download relay.
    pub proxy: DownloadProxy,
}

/// Builds the router with request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route(DOWNLOAD_ROUTE, get(download))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Serves the router on `listener` until Ctrl-C.
///
/// # Errors
///
/// Returns the underlying I/O error if the server fails.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
            }
        })
        .await
}

/// Error response body: `{ "error": kind, "detail": message }`.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    kind: &'static str,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_input",
            detail: detail.into(),
        }
    }
}

impl From<ProxyError> for ApiError {
    fn from(error: ProxyError) -> Self {
        Self {
            status: StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::BAD_GATEWAY),
            kind: error.kind(),
            detail: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": self.kind, "detail": self.detail })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    query: String,
    results: Vec<FoundFile>,
    message: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
struct DownloadParams {
    #[serde(default)]
    url: String,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.q.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::bad_request("query parameter `q` must not be empty"));
    }
    let results = state.finder.find(&query).await;
    let message = results.is_empty().then_some(NO_RESULTS_MESSAGE);
    Ok(Json(SearchResponse {
        query,
        results,
        message,
    }))
}

async fn download(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, ApiError> {
    let download = state.proxy.open_download(&params.url).await.map_err(|error| {
        warn!(error = %error, "download rejected");
        ApiError::from(error)
    })?;
    let headers = [
        (CONTENT_TYPE, download.content_type.clone()),
        (CONTENT_DISPOSITION, download.content_disposition()),
    ];
    Ok((headers, Body::from_stream(download.body)).into_response())
}
