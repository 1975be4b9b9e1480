//! Download command handler: relay one file through the proxy to disk or stdout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use filefinder_core::{DownloadProxy, DownloadStream};
use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::cli::DownloadArgs;

/// Where the body goes.
#[derive(Debug, PartialEq, Eq)]
enum Destination {
    Stdout,
    File(PathBuf),
}

pub async fn run_download_command(args: &DownloadArgs) -> Result<()> {
    let proxy = DownloadProxy::new().context("failed to initialize download proxy")?;
    let download = proxy
        .open_download(&args.url)
        .await
        .with_context(|| format!("download failed for {}", args.url))?;

    let destination = resolve_destination(args.output.as_deref(), &download.disposition_name);
    info!(content_type = %download.content_type, ?destination, "download started");

    match destination {
        Destination::Stdout => {
            let mut stdout = tokio::io::stdout();
            let written = copy_body(download.body, &mut stdout).await?;
            debug!(bytes = written, "download written to stdout");
        }
        Destination::File(path) => {
            let written = write_to_file(download.body, &path).await?;
            info!(bytes = written, path = %path.display(), "download complete");
        }
    }
    Ok(())
}

/// Streams the body into `path`, removing the partial file on failure.
async fn write_to_file(body: DownloadStream, path: &Path) -> Result<u64> {
    let mut file = File::create(path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;
    let result = copy_body(body, &mut file).await;
    if result.is_err() {
        debug!(path = %path.display(), "cleaning up partial file after error");
        drop(file);
        let _ = tokio::fs::remove_file(path).await;
    }
    result
}

async fn copy_body<W>(mut body: DownloadStream, sink: W) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(sink);
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.context("download interrupted")?;
        writer
            .write_all(&chunk)
            .await
            .context("failed to write download")?;
        bytes_written += chunk.len() as u64;
    }

    writer.flush().await.context("failed to flush download")?;
    Ok(bytes_written)
}

fn resolve_destination(output: Option<&Path>, disposition_name: &str) -> Destination {
    match output {
        Some(path) if path.as_os_str() == "-" => Destination::Stdout,
        Some(path) if path.is_dir() => {
            Destination::File(path.join(local_file_name(disposition_name)))
        }
        Some(path) => Destination::File(path.to_path_buf()),
        None => Destination::File(PathBuf::from(local_file_name(disposition_name))),
    }
}

/// Decodes the header filename into something safe to create locally.
fn local_file_name(disposition_name: &str) -> String {
    let decoded = urlencoding::decode(disposition_name)
        .map_or_else(|_| disposition_name.to_string(), std::borrow::Cow::into_owned);
    let cleaned: String = decoded
        .chars()
        .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '_' } else { c })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "download".to_string(),
        name => name.to_string(),
    }
}
