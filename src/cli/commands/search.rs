//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::models::{Modality, VideoId};
use crate::orchestrator::Orchestrator;
use crate::rag::Evidence;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(
    query: &str,
    modality: Option<Modality>,
    video: Option<VideoId>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let result = orchestrator.search(query, modality, video).await;
    spinner.finish_and_clear();

    let evidence = match result {
        Ok(evidence) => evidence,
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    };

    if evidence.is_empty() {
        Output::info(&format!("No {} results found.", evidence.modality()));
        return Ok(());
    }

    Output::header(&format!("Results ({})", evidence.modality()));
    match &evidence {
        Evidence::Summary(Some(summary)) => println!("\n{}", summary),
        _ => {
            for item in evidence.result_items() {
                Output::result_item(&item);
            }
        }
    }
    println!();

    Ok(())
}
