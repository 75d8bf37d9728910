//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::create_store;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let store = create_store(&settings)?;

    match store.list_videos().await {
        Ok(videos) => {
            if videos.is_empty() {
                Output::info("No video indexed yet. Use 'glimt ingest <path>' to add one.");
            } else {
                Output::header(&format!("Indexed Videos ({})", videos.len()));
                println!();

                for video in &videos {
                    Output::video_info(video);
                }

                println!();
                Output::kv("Total highlights", &store.highlight_count().await?.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list videos: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
