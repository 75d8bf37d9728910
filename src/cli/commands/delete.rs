//! Delete command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::models::VideoId;
use crate::vector_store::create_store;
use anyhow::Result;

/// Run the delete command.
pub async fn run_delete(video_id: VideoId, settings: Settings) -> Result<()> {
    let store = create_store(&settings)?;

    if store.delete_video(video_id).await? {
        Output::success(&format!("Deleted video {}", video_id));
    } else {
        Output::warning(&format!("No video with id {}", video_id));
    }

    Ok(())
}
