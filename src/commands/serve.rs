//! Serve command handler: expose search and download over HTTP.

use anyhow::{Context, Result};
use filefinder_core::DownloadProxy;
use filefinder_core::server::{self, AppState};
use tokio::net::TcpListener;

use super::build_finder;
use crate::cli::ServeArgs;

pub async fn run_serve_command(args: &ServeArgs) -> Result<()> {
    let finder = build_finder(&args.discovery)?;
    let proxy = DownloadProxy::new().context("failed to initialize download proxy")?;
    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    server::serve(listener, AppState { finder, proxy })
        .await
        .context("server error")
}
