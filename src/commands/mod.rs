//! CLI command handlers.

mod download;
mod search;
mod serve;

pub use download::run_download_command;
pub use search::run_search_command;
pub use serve::run_serve_command;

use std::sync::Arc;

use anyhow::{Context, Result};
use filefinder_core::{
    CandidatePipeline, DuckDuckGoProvider, FallbackAssistant, FileFinder, OpenAiAssistant,
    QueryAssistant,
};
use tracing::{debug, info};

use crate::cli::DiscoveryArgs;

/// Wires the search backend, pipeline and assistant from CLI flags.
///
/// The model-backed assistant is used only when an API key is configured.
pub(crate) fn build_finder(args: &DiscoveryArgs) -> Result<FileFinder> {
    let config = args.to_config();
    let provider = DuckDuckGoProvider::with_base_url(
        args.search_url.clone(),
        config.search_timeout,
        config.connect_timeout,
    )
    .context("failed to initialize search backend")?;
    let pipeline = CandidatePipeline::new(Arc::new(provider), &config)
        .context("failed to initialize discovery pipeline")?;

    let fallback = FallbackAssistant::new(config.rank_limit);
    let assistant: Arc<dyn QueryAssistant> = match args
        .openai_api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
    {
        Some(key) => {
            info!(model = %args.openai_model, "query assistant enabled");
            Arc::new(
                OpenAiAssistant::new(key, &args.openai_model, &args.openai_base_url, fallback)
                    .context("failed to initialize query assistant")?,
            )
        }
        None => {
            debug!("no API key configured; using heuristic assistant");
            Arc::new(fallback)
        }
    };

    Ok(FileFinder::new(pipeline, assistant, config))
}
