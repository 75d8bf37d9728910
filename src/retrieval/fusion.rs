//! Temporal fusion of audio segments with co-occurring visual highlights.

use crate::config::RetrievalSettings;
use crate::error::Result;
use crate::models::{FusedSegment, RankedResult};
use crate::vector_store::{HighlightStore, ModalityFilter};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Attaches to each audio segment the visuals sampled while it was spoken.
///
/// Visuals are matched by time, not content, so they carry a fixed
/// placeholder similarity instead of a score.
pub struct TemporalFusionJoiner {
    store: Arc<dyn HighlightStore>,
    padding_seconds: f64,
    default_window_seconds: f64,
    max_visuals: usize,
    time_matched_similarity: f32,
}

impl TemporalFusionJoiner {
    /// Joiner with the default window: 2 s padding, 5 s fallback length,
    /// 3 visuals at similarity 0.8.
    pub fn new(store: Arc<dyn HighlightStore>) -> Self {
        Self::from_settings(store, &RetrievalSettings::default())
    }

    pub fn from_settings(store: Arc<dyn HighlightStore>, settings: &RetrievalSettings) -> Self {
        Self {
            store,
            padding_seconds: settings.fusion_padding_seconds,
            default_window_seconds: settings.fusion_default_window_seconds,
            max_visuals: settings.fusion_max_visuals,
            time_matched_similarity: settings.time_matched_similarity,
        }
    }

    /// The `[start, end]` range searched for a segment, padding included.
    pub fn window(&self, segment: &RankedResult) -> (f64, f64) {
        let start = segment.highlight.timestamp;
        let end = segment
            .highlight
            .end_timestamp
            .unwrap_or(start + self.default_window_seconds);
        (start - self.padding_seconds, end + self.padding_seconds)
    }

    /// One fused segment per input, in input order.
    #[instrument(skip_all, fields(segments = audio_segments.len()))]
    pub async fn fuse(&self, audio_segments: Vec<RankedResult>) -> Result<Vec<FusedSegment>> {
        let mut fused = Vec::with_capacity(audio_segments.len());

        for segment in audio_segments {
            let (from, to) = self.window(&segment);
            let related_visuals: Vec<RankedResult> = self
                .store
                .highlights_in_range(
                    segment.highlight.video_id,
                    from,
                    to,
                    ModalityFilter::VisualOnly,
                    self.max_visuals,
                )
                .await?
                .into_iter()
                .map(|v| RankedResult::new(v.highlight, v.filename, self.time_matched_similarity))
                .collect();

            debug!(
                "Segment at {:.1}s matched {} visuals in [{:.1}, {:.1}]",
                segment.highlight.timestamp,
                related_visuals.len(),
                from,
                to
            );

            let timestamp = segment.highlight.timestamp;
            let end_timestamp = segment
                .highlight
                .end_timestamp
                .unwrap_or(timestamp + self.default_window_seconds);

            fused.push(FusedSegment {
                audio_segment: segment,
                related_visuals,
                timestamp,
                end_timestamp,
            });
        }

        Ok(fused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceMetric;
    use crate::models::{Highlight, VideoId};
    use crate::vector_store::test_support::{audio, embedding, visual};
    use crate::vector_store::MemoryHighlightStore;

    async fn store_with_visuals(stamps: &[f64]) -> (Arc<dyn HighlightStore>, VideoId) {
        let store = MemoryHighlightStore::new(4, DistanceMetric::Cosine).unwrap();
        let video = store.insert_video("talk.mp4", 30.0).await.unwrap();
        let visuals: Vec<_> = stamps
            .iter()
            .map(|t| visual(video.id, *t, &format!("frame {}", t), embedding(4, 1, 0.0)))
            .collect();
        store.insert_highlights(&visuals).await.unwrap();
        store
            .insert_highlight(&audio(video.id, 11.0, 12.0, "an audio row", embedding(4, 0, 0.0)))
            .await
            .unwrap();
        (Arc::new(store), video.id)
    }

    fn segment(video_id: VideoId, start: f64, end: Option<f64>) -> RankedResult {
        RankedResult::new(
            Highlight {
                id: 99,
                video_id,
                timestamp: start,
                end_timestamp: end,
                description: "we landed in athens".to_string(),
                embedding: vec![],
            },
            "talk.mp4".to_string(),
            0.9,
        )
    }

    fn stamps(fused: &FusedSegment) -> Vec<f64> {
        fused
            .related_visuals
            .iter()
            .map(|v| v.highlight.timestamp)
            .collect()
    }

    #[tokio::test]
    async fn test_visuals_within_padded_window() {
        let (store, video_id) = store_with_visuals(&[7.0, 9.5, 12.0, 16.0]).await;
        let joiner = TemporalFusionJoiner::new(store);

        let fused = joiner
            .fuse(vec![segment(video_id, 10.0, Some(13.0))])
            .await
            .unwrap();

        assert_eq!(fused.len(), 1);
        assert_eq!(stamps(&fused[0]), vec![9.5, 12.0]);
        assert_eq!(fused[0].timestamp, 10.0);
        assert_eq!(fused[0].end_timestamp, 13.0);
        assert!(fused[0]
            .related_visuals
            .iter()
            .all(|v| (v.similarity - 0.8).abs() < f32::EPSILON));
    }

    #[tokio::test]
    async fn test_missing_end_uses_default_window() {
        let (store, video_id) = store_with_visuals(&[1.0, 6.5, 7.5, 9.5]).await;
        let joiner = TemporalFusionJoiner::new(store);

        let fused = joiner.fuse(vec![segment(video_id, 2.0, None)]).await.unwrap();

        // [2 - 2, 2 + 5 + 2]
        assert_eq!(stamps(&fused[0]), vec![1.0, 6.5, 7.5]);
        assert_eq!(fused[0].end_timestamp, 7.0);
    }

    #[tokio::test]
    async fn test_caps_visuals_and_keeps_order() {
        let (store, video_id) = store_with_visuals(&[10.0, 11.0, 12.0, 13.0, 14.0]).await;
        let joiner = TemporalFusionJoiner::new(store);

        let fused = joiner
            .fuse(vec![
                segment(video_id, 20.0, Some(21.0)),
                segment(video_id, 10.0, Some(14.0)),
            ])
            .await
            .unwrap();

        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].timestamp, 20.0);
        assert!(fused[0].related_visuals.is_empty());
        assert_eq!(stamps(&fused[1]), vec![10.0, 11.0, 12.0]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let (store, _) = store_with_visuals(&[1.0]).await;
        let fused = TemporalFusionJoiner::new(store).fuse(vec![]).await.unwrap();
        assert!(fused.is_empty());
    }

    #[tokio::test]
    async fn test_custom_settings() {
        let (store, video_id) = store_with_visuals(&[7.0, 9.5, 12.0, 16.0]).await;
        let settings = RetrievalSettings {
            fusion_padding_seconds: 0.0,
            fusion_max_visuals: 1,
            time_matched_similarity: 0.5,
            ..Default::default()
        };
        let joiner = TemporalFusionJoiner::from_settings(store, &settings);

        let fused = joiner
            .fuse(vec![segment(video_id, 10.0, Some(13.0))])
            .await
            .unwrap();
        assert_eq!(stamps(&fused[0]), vec![12.0]);
        assert_eq!(fused[0].related_visuals[0].similarity, 0.5);
    }
}
