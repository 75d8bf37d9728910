//! Whole-video summaries generated at ingest time.

use super::AnswerGenerator;
use crate::config::Prompts;
use crate::error::{with_timeout, Result};
use crate::models::{AudioSegment, FrameCaption};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Summarizes a video from its full transcript and visual scenes.
pub struct SummaryGenerator {
    generator: Arc<dyn AnswerGenerator>,
    prompts: Prompts,
    timeout: Duration,
}

impl SummaryGenerator {
    pub fn new(generator: Arc<dyn AnswerGenerator>, prompts: Prompts, timeout: Duration) -> Self {
        Self {
            generator,
            prompts,
            timeout,
        }
    }

    /// Render the summary prompt.
    pub fn build_prompt(
        &self,
        duration: f64,
        captions: &[FrameCaption],
        segments: &[AudioSegment],
    ) -> String {
        let transcript = if segments.is_empty() {
            "No audio content available".to_string()
        } else {
            segments
                .iter()
                .map(|s| format!("[{:.1}s-{:.1}s]: {}", s.start_timestamp, s.end_timestamp, s.text))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let scenes = if captions.is_empty() {
            "No visual descriptions available".to_string()
        } else {
            captions
                .iter()
                .map(|c| format!("[{:.1}s]: {}", c.timestamp, c.description))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let mut vars = HashMap::new();
        vars.insert("duration".to_string(), format!("{:.1}", duration));
        vars.insert("visual_count".to_string(), captions.len().to_string());
        vars.insert("audio_count".to_string(), segments.len().to_string());
        vars.insert("transcript".to_string(), transcript);
        vars.insert("scenes".to_string(), scenes);

        self.prompts.render_with_custom(&self.prompts.summary.user, &vars)
    }

    /// Generate a summary. Blank output counts as no summary.
    #[instrument(skip_all, fields(captions = captions.len(), segments = segments.len()))]
    pub async fn generate(
        &self,
        duration: f64,
        captions: &[FrameCaption],
        segments: &[AudioSegment],
    ) -> Result<Option<String>> {
        let prompt = self.build_prompt(duration, captions, segments);
        let summary = with_timeout(
            "summary generation",
            self.timeout,
            self.generator.generate(&prompt),
        )
        .await?;

        let summary = summary.trim();
        debug!("Generated summary of {} chars", summary.len());
        Ok((!summary.is_empty()).then(|| summary.to_string()))
    }
}
