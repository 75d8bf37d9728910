//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::Path;

/// Run the ingest command.
pub async fn run_ingest(path: &str, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let path = Settings::expand_path(path);

    let spinner = Output::spinner(&format!(
        "Captioning frames and transcribing {}...",
        display_name(&path)
    ));

    match orchestrator.ingest(&path).await {
        Ok(report) => {
            spinner.finish_and_clear();
            Output::success(&format!(
                "Ingested {} as video {}",
                report.video.filename, report.video.id
            ));
            Output::kv("Visual highlights", &report.visual_highlights.to_string());
            Output::kv("Audio highlights", &report.audio_highlights.to_string());
            if !report.summary_stored {
                Output::warning("No summary could be generated for this video.");
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Ingestion failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
