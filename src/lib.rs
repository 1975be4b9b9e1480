//! File Finder Core Library
//!
//! Turns a free-text query into a ranked list of directly downloadable file
//! URLs (PDF, ZIP, media, office documents, images) and proxies the actual
//! download without buffering it in memory.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`classify`] - Direct-file URL classification against an extension allowlist
//! - [`extract`] - Best-effort `<a href>` extraction from HTML pages
//! - [`probe`] - Advisory content-type probing via HEAD requests
//! - [`search`] - Search backend adapters
//! - [`pipeline`] - Candidate discovery (search, classify, crawl, dedup)
//! - [`assist`] - Optional query enrichment and ranking
//! - [`finder`] - Enrich, discover and rank in one call
//! - [`proxy`] - Streaming download proxy
//! - [`server`] - HTTP surface over the finder and the proxy

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assist;
pub mod classify;
pub mod config;
pub mod extract;
pub mod finder;
pub mod http_client;
pub mod pipeline;
pub mod probe;
pub mod proxy;
pub mod search;
pub mod server;
mod user_agent;

// Re-export commonly used types
pub use assist::{Enrichment, FallbackAssistant, OpenAiAssistant, QueryAssistant};
pub use classify::{ExtensionAllowlist, is_direct_file};
pub use config::{DiscoveryConfig, ProxyConfig};
pub use extract::PageLinkExtractor;
pub use finder::{FileFinder, FoundFile, download_href};
pub use http_client::ClientBuildError;
pub use pipeline::{Candidate, CandidatePipeline, CandidateReason};
pub use probe::ContentTypeProber;
pub use proxy::{DownloadProxy, DownloadStream, ProxiedDownload, ProxyError, SessionStage};
pub use search::{DuckDuckGoProvider, SearchError, SearchHit, SearchProvider};
pub use user_agent::BROWSER_USER_AGENT;
