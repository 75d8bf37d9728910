//! Summary command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::GlimtError;
use crate::models::VideoId;
use crate::vector_store::create_store;
use anyhow::Result;

/// Run the summary command.
pub async fn run_summary(video: Option<VideoId>, settings: Settings) -> Result<()> {
    let store = create_store(&settings)?;

    let video = match video {
        Some(id) => store
            .get_video(id)
            .await?
            .ok_or_else(|| GlimtError::VideoNotFound(id.to_string()))?,
        None => match store.latest_video().await? {
            Some(video) => video,
            None => {
                Output::info("No video indexed yet. Use 'glimt ingest <path>' to add one.");
                return Ok(());
            }
        },
    };

    match store.latest_summary(video.id).await? {
        Some(summary) => {
            Output::header(&video.filename);
            println!("\n{}\n", summary.summary);
        }
        None => Output::warning(&format!("No summary stored for {}", video.filename)),
    }

    Ok(())
}
