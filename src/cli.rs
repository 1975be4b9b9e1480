//! CLI argument definitions using clap derive macros.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use filefinder_core::assist::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
use filefinder_core::config::{
    DEFAULT_DISCOVERY_CONCURRENCY, DEFAULT_MAX_RESULTS, DEFAULT_RANK_LIMIT,
};
use filefinder_core::search::DEFAULT_DUCKDUCKGO_URL;
use filefinder_core::{DiscoveryConfig, ExtensionAllowlist};

/// Default allowlist in its command-line form.
pub const DEFAULT_EXTENSIONS_CSV: &str = "pdf,zip,mp3,mp4,docx,xlsx,pptx,png,jpg,jpeg,epub,txt";

/// Find direct download links for files and fetch them.
///
/// Searches the web for a free-text query, keeps only links that point
/// straight at a file, and relays downloads without buffering them.
#[derive(Parser, Debug)]
#[command(name = "filefinder")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search for direct file links matching a query
    Search(SearchArgs),
    /// Download a file through the streaming proxy
    Download(DownloadArgs),
    /// Serve the search and download routes over HTTP
    Serve(ServeArgs),
}

/// Options shared by every command that runs discovery.
#[derive(Args, Clone)]
pub struct DiscoveryArgs {
    /// Comma-separated file extensions to accept
    #[arg(long, env = "ALLOWED_FILE_EXTENSIONS", default_value = DEFAULT_EXTENSIONS_CSV)]
    pub extensions: String,

    /// Search results to request from the backend (1-50)
    #[arg(
        short = 'n',
        long,
        env = "MAX_RESULTS",
        default_value_t = DEFAULT_MAX_RESULTS as u8,
        value_parser = clap::value_parser!(u8).range(1..=50)
    )]
    pub max_results: u8,

    /// Result pages crawled or probed at once (1-64)
    #[arg(
        short = 'c',
        long,
        default_value_t = DEFAULT_DISCOVERY_CONCURRENCY as u8,
        value_parser = clap::value_parser!(u8).range(1..=64)
    )]
    pub concurrency: u8,

    /// Candidates kept when ranking without an assistant (1-200)
    #[arg(
        long,
        env = "RANK_LIMIT",
        default_value_t = DEFAULT_RANK_LIMIT as u16,
        value_parser = clap::value_parser!(u16).range(1..=200)
    )]
    pub rank_limit: u16,

    /// API key enabling query enrichment and ranking
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Chat model used for enrichment and ranking
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_OPENAI_MODEL)]
    pub openai_model: String,

    /// Base URL of the chat completions API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    pub openai_base_url: String,

    /// Search backend endpoint
    #[arg(long, env = "SEARCH_URL", default_value = DEFAULT_DUCKDUCKGO_URL, hide = true)]
    pub search_url: String,
}

impl std::fmt::Debug for DiscoveryArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryArgs")
            .field("extensions", &self.extensions)
            .field("max_results", &self.max_results)
            .field("concurrency", &self.concurrency)
            .field("rank_limit", &self.rank_limit)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("openai_model", &self.openai_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("search_url", &self.search_url)
            .finish()
    }
}

impl DiscoveryArgs {
    /// Converts parsed flags into a [`DiscoveryConfig`].
    pub fn to_config(&self) -> DiscoveryConfig {
        let defaults = DiscoveryConfig::default();
        let parsed = ExtensionAllowlist::parse_csv(&self.extensions);
        DiscoveryConfig {
            allowed_extensions: if parsed.is_empty() {
                defaults.allowed_extensions.clone()
            } else {
                parsed
            },
            max_results: usize::from(self.max_results),
            concurrency: usize::from(self.concurrency),
            rank_limit: usize::from(self.rank_limit),
            ..defaults
        }
    }
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Free-text query
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    #[command(flatten)]
    pub discovery: DiscoveryArgs,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// http(s) URL of the file
    pub url: String,

    /// Destination file or directory; `-` writes to stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, env = "BIND_ADDR", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    #[command(flatten)]
    pub discovery: DiscoveryArgs,
}
