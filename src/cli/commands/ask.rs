//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::models::VideoId;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    video: Option<VideoId>,
    json: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Looking through the video...");
    let result = orchestrator.ask(question, video).await;
    spinner.finish_and_clear();

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            Output::error(&format!("Failed to answer: {}", e));
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("\n{}\n", response.response);
    Output::kv("Answered from", response.data_type_used.as_str());

    if !response.results.is_empty() {
        Output::header("Evidence");
        for item in &response.results {
            Output::result_item(item);
        }
        println!();
    }

    Ok(())
}
