//! Search command handler: find direct file links and print them.

use anyhow::{Context, Result};
use filefinder_core::FoundFile;
use filefinder_core::server::NO_RESULTS_MESSAGE;

use super::build_finder;
use crate::cli::SearchArgs;

pub async fn run_search_command(args: &SearchArgs) -> Result<()> {
    let finder = build_finder(&args.discovery)?;
    let query = args.query.join(" ");
    let results = finder.find(&query).await;

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&results).context("failed to serialize results")?;
        println!("{rendered}");
        return Ok(());
    }

    if results.is_empty() {
        println!("{NO_RESULTS_MESSAGE}");
        return Ok(());
    }

    for (index, result) in results.iter().enumerate() {
        println!("{}", render_result_row(index + 1, result));
    }
    Ok(())
}

fn render_result_row(position: usize, result: &FoundFile) -> String {
    let candidate = &result.candidate;
    let title = if candidate.title.is_empty() {
        "(untitled)"
    } else {
        candidate.title.as_str()
    };
    let content_type = if candidate.content_type.is_empty() {
        "unknown type"
    } else {
        candidate.content_type.as_str()
    };
    format!(
        "{position:>2}. [{reason}] [{content_type}] {url} ({title}, via {page})",
        reason = candidate.reason.label(),
        url = candidate.direct_url,
        page = candidate.source_page,
    )
}
