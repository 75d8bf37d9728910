//! Visual captioning of sampled video frames.

mod openai;

pub use openai::OpenAICaptioner;

use crate::error::{with_timeout, Result};
use crate::media::SampledFrame;
use crate::models::FrameCaption;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Trait for frame captioning services.
#[async_trait]
pub trait Captioner: Send + Sync {
    /// Describe the image at `frame`, sampled at `timestamp` seconds.
    async fn caption(&self, frame: &Path, timestamp: f64) -> Result<String>;
}

/// Caption every frame with bounded concurrency.
///
/// Output is ordered by timestamp; blank captions are dropped. The first
/// failure (or timeout) aborts the whole run.
#[instrument(skip_all, fields(frames = frames.len()))]
pub async fn caption_frames(
    captioner: &dyn Captioner,
    frames: &[SampledFrame],
    max_concurrent: usize,
    timeout: Duration,
) -> Result<Vec<FrameCaption>> {
    let mut captions: Vec<FrameCaption> = stream::iter(frames.iter().cloned())
        .map(|frame| async move {
            let text = with_timeout(
                "frame captioning",
                timeout,
                captioner.caption(&frame.path, frame.timestamp),
            )
            .await?;
            Ok::<_, crate::error::GlimtError>(FrameCaption {
                timestamp: frame.timestamp,
                description: text.trim().to_string(),
            })
        })
        .buffer_unordered(max_concurrent.max(1))
        .try_collect()
        .await?;

    let total = captions.len();
    captions.retain(|c| !c.description.is_empty());
    captions.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    if captions.len() < total {
        debug!("Dropped {} blank captions", total - captions.len());
    }
    info!("Captioned {} frames", captions.len());
    Ok(captions)
}
