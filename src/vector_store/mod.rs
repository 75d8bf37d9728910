//! Highlight store abstraction for Glimt.
//!
//! Provides a trait-based interface over the vector-capable store that holds
//! videos, their embedded highlights and their summaries.

mod memory;
mod sqlite;

pub use memory::MemoryHighlightStore;
pub use sqlite::SqliteHighlightStore;

use crate::config::{DistanceMetric, Settings};
use crate::error::{GlimtError, Result};
use crate::models::{
    Highlight, HighlightId, NewHighlight, RankedResult, Video, VideoHighlight, VideoId,
    VideoSummary,
};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;

/// Restricts a query to one kind of highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalityFilter {
    /// Highlights without an end timestamp.
    VisualOnly,
    /// Highlights with an end timestamp.
    AudioOnly,
}

impl ModalityFilter {
    pub fn matches(&self, highlight: &Highlight) -> bool {
        match self {
            ModalityFilter::VisualOnly => highlight.end_timestamp.is_none(),
            ModalityFilter::AudioOnly => highlight.end_timestamp.is_some(),
        }
    }

    /// SQL predicate selecting the same rows as [`ModalityFilter::matches`].
    pub(crate) fn sql_predicate(&self) -> &'static str {
        match self {
            ModalityFilter::VisualOnly => "h.end_timestamp IS NULL",
            ModalityFilter::AudioOnly => "h.end_timestamp IS NOT NULL",
        }
    }
}

/// Trait for highlight store implementations.
///
/// Writes are expected to be serialized by the caller; reads may run
/// concurrently with each other.
#[async_trait]
pub trait HighlightStore: Send + Sync {
    /// Embedding dimensionality every highlight must have.
    fn dimensions(&self) -> usize;

    /// Create a video record.
    async fn insert_video(&self, filename: &str, duration: f64) -> Result<Video>;

    /// Store one highlight.
    async fn insert_highlight(&self, highlight: &NewHighlight) -> Result<HighlightId>;

    /// Store many highlights; nothing is written if any row is invalid.
    async fn insert_highlights(&self, highlights: &[NewHighlight]) -> Result<usize>;

    /// Store a summary for a video.
    async fn insert_summary(&self, video_id: VideoId, summary: &str) -> Result<VideoSummary>;

    /// The most recent summary of a video.
    async fn latest_summary(&self, video_id: VideoId) -> Result<Option<VideoSummary>>;

    /// Highlights matching `filter`, most similar first (ties by timestamp).
    async fn nearest_neighbors(
        &self,
        embedding: &[f32],
        filter: ModalityFilter,
        limit: Option<usize>,
    ) -> Result<Vec<RankedResult>>;

    /// Highlights of a video with `start <= timestamp <= end`, ordered by timestamp.
    async fn highlights_in_range(
        &self,
        video_id: VideoId,
        start: f64,
        end: f64,
        filter: ModalityFilter,
        limit: usize,
    ) -> Result<Vec<VideoHighlight>>;

    /// Remove every summary, highlight and video.
    async fn clear_all(&self) -> Result<()>;

    /// Remove a video with its highlights and summaries. Returns false if absent.
    async fn delete_video(&self, video_id: VideoId) -> Result<bool>;

    /// All videos, newest first.
    async fn list_videos(&self) -> Result<Vec<Video>>;

    /// A specific video.
    async fn get_video(&self, video_id: VideoId) -> Result<Option<Video>>;

    /// The most recently ingested video.
    async fn latest_video(&self) -> Result<Option<Video>> {
        Ok(self.list_videos().await?.into_iter().next())
    }

    /// All highlights of a video, ordered by timestamp.
    async fn highlights_for_video(&self, video_id: VideoId) -> Result<Vec<Highlight>>;

    /// Total highlight count.
    async fn highlight_count(&self) -> Result<usize>;
}

/// Create the store selected in the settings.
pub fn create_store(settings: &Settings) -> Result<Arc<dyn HighlightStore>> {
    let dimensions = settings.embedding.dimensions;
    let metric = settings.vector_store.metric;

    match settings.vector_store.provider.to_lowercase().as_str() {
        "sqlite" => Ok(Arc::new(SqliteHighlightStore::new(
            &settings.sqlite_path(),
            dimensions,
            metric,
        )?)),
        "memory" => Ok(Arc::new(MemoryHighlightStore::new(dimensions, metric)?)),
        other => Err(GlimtError::Config(format!(
            "Unknown vector store provider: {}",
            other
        ))),
    }
}

/// Reject a zero dimensionality when a store is constructed.
pub(crate) fn validate_configured_dimensions(dimensions: usize) -> Result<()> {
    if dimensions == 0 {
        return Err(GlimtError::Config(
            "Highlight store needs a non-zero embedding dimensionality".to_string(),
        ));
    }
    Ok(())
}

/// Reject an embedding whose length differs from the store's.
pub(crate) fn check_dimensions(expected: usize, embedding: &[f32]) -> Result<()> {
    if embedding.len() != expected {
        return Err(GlimtError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(())
}

/// Order by similarity descending, then timestamp ascending.
pub fn rank_order(a: &RankedResult, b: &RankedResult) -> Ordering {
    b.similarity
        .partial_cmp(&a.similarity)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            a.highlight
                .timestamp
                .partial_cmp(&b.highlight.timestamp)
                .unwrap_or(Ordering::Equal)
        })
}

/// Score `candidates` against `query`, sort, and apply the optional limit.
pub(crate) fn rank_candidates(
    query: &[f32],
    metric: DistanceMetric,
    candidates: impl IntoIterator<Item = VideoHighlight>,
    limit: Option<usize>,
) -> Vec<RankedResult> {
    let mut results: Vec<RankedResult> = candidates
        .into_iter()
        .map(|c| {
            let similarity = metric.similarity(query, &c.highlight.embedding);
            RankedResult::new(c.highlight, c.filename, similarity)
        })
        .collect();

    results.sort_by(rank_order);
    if let Some(limit) = limit {
        results.truncate(limit);
    }
    results
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Compute the euclidean distance between two vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared helpers for store-backed tests.

    use super::*;

    /// Unit vector of length `dims` pointing along `axis`, tilted toward the next axis.
    pub fn embedding(dims: usize, axis: usize, tilt: f32) -> Vec<f32> {
        let mut v = vec![0.0; dims];
        v[axis % dims] = 1.0;
        v[(axis + 1) % dims] = tilt;
        v
    }

    pub fn visual(video_id: VideoId, timestamp: f64, description: &str, embedding: Vec<f32>) -> NewHighlight {
        NewHighlight {
            video_id,
            timestamp,
            end_timestamp: None,
            description: description.to_string(),
            embedding,
        }
    }

    pub fn audio(
        video_id: VideoId,
        timestamp: f64,
        end_timestamp: f64,
        description: &str,
        embedding: Vec<f32>,
    ) -> NewHighlight {
        NewHighlight {
            video_id,
            timestamp,
            end_timestamp: Some(end_timestamp),
            description: description.to_string(),
            embedding,
        }
    }

    /// Contract checks every store implementation must pass.
    pub async fn exercise_store(store: &dyn HighlightStore) {
        let dims = store.dimensions();
        let video = store.insert_video("talk.mp4", 30.0).await.unwrap();

        // Round trip: a highlight is its own nearest neighbour.
        let own = embedding(dims, 0, 0.0);
        store
            .insert_highlight(&audio(video.id, 10.0, 13.0, "we landed in athens", own.clone()))
            .await
            .unwrap();
        store
            .insert_highlight(&audio(video.id, 20.0, 22.0, "the budget is tight", embedding(dims, 2, 0.0)))
            .await
            .unwrap();
        store
            .insert_highlights(&[
                visual(video.id, 7.0, "a plane on a runway", embedding(dims, 0, 0.5)),
                visual(video.id, 9.5, "a man at the gate", embedding(dims, 1, 0.0)),
                visual(video.id, 12.0, "a city skyline", embedding(dims, 1, 0.2)),
                visual(video.id, 16.0, "a spreadsheet", embedding(dims, 2, 0.1)),
            ])
            .await
            .unwrap();

        let audio_hits = store
            .nearest_neighbors(&own, ModalityFilter::AudioOnly, None)
            .await
            .unwrap();
        assert_eq!(audio_hits.len(), 2);
        assert_eq!(audio_hits[0].highlight.description, "we landed in athens");
        assert!((audio_hits[0].similarity - 1.0).abs() < 1e-5);
        assert_eq!(audio_hits[0].filename, "talk.mp4");
        assert!(audio_hits.iter().all(|r| r.highlight.is_audio()));

        let visual_hits = store
            .nearest_neighbors(&own, ModalityFilter::VisualOnly, Some(2))
            .await
            .unwrap();
        assert_eq!(visual_hits.len(), 2);
        assert_eq!(visual_hits[0].highlight.timestamp, 7.0);
        assert!(visual_hits.iter().all(|r| r.highlight.is_visual()));
        assert!(visual_hits[0].similarity >= visual_hits[1].similarity);

        // Range query is inclusive and ordered by timestamp.
        let in_range = store
            .highlights_in_range(video.id, 8.0, 15.0, ModalityFilter::VisualOnly, 3)
            .await
            .unwrap();
        let stamps: Vec<f64> = in_range.iter().map(|h| h.highlight.timestamp).collect();
        assert_eq!(stamps, vec![9.5, 12.0]);

        let capped = store
            .highlights_in_range(video.id, 0.0, 100.0, ModalityFilter::VisualOnly, 3)
            .await
            .unwrap();
        assert_eq!(capped.len(), 3);

        // Dimensionality is enforced before anything is written.
        let before = store.highlight_count().await.unwrap();
        let bad = store
            .insert_highlights(&[
                visual(video.id, 1.0, "ok", embedding(dims, 0, 0.0)),
                visual(video.id, 2.0, "bad", vec![1.0; dims + 1]),
            ])
            .await;
        assert!(matches!(bad, Err(GlimtError::DimensionMismatch { .. })));
        assert_eq!(store.highlight_count().await.unwrap(), before);

        let bad_query = store
            .nearest_neighbors(&[1.0], ModalityFilter::AudioOnly, None)
            .await;
        assert!(matches!(bad_query, Err(GlimtError::DimensionMismatch { .. })));

        // The newest summary wins.
        assert!(store.latest_summary(video.id).await.unwrap().is_none());
        store.insert_summary(video.id, "first draft").await.unwrap();
        store.insert_summary(video.id, "second draft").await.unwrap();
        let summary = store.latest_summary(video.id).await.unwrap().unwrap();
        assert_eq!(summary.summary, "second draft");

        assert_eq!(store.latest_video().await.unwrap().map(|v| v.id), Some(video.id));
        assert_eq!(store.highlights_for_video(video.id).await.unwrap().len(), 6);

        // Clearing twice is fine and leaves nothing behind.
        store.clear_all().await.unwrap();
        store.clear_all().await.unwrap();
        assert_eq!(store.highlight_count().await.unwrap(), 0);
        assert!(store.list_videos().await.unwrap().is_empty());
        assert!(store.latest_summary(video.id).await.unwrap().is_none());
    }

    /// Deleting a video removes its highlights and summaries only.
    pub async fn exercise_cascade(store: &dyn HighlightStore) {
        let dims = store.dimensions();
        let keep = store.insert_video("keep.mp4", 10.0).await.unwrap();
        let drop = store.insert_video("drop.mp4", 10.0).await.unwrap();

        store
            .insert_highlight(&visual(keep.id, 1.0, "kept", embedding(dims, 0, 0.0)))
            .await
            .unwrap();
        store
            .insert_highlight(&visual(drop.id, 1.0, "dropped", embedding(dims, 0, 0.0)))
            .await
            .unwrap();
        store.insert_summary(drop.id, "gone soon").await.unwrap();

        assert!(store.delete_video(drop.id).await.unwrap());
        assert!(!store.delete_video(drop.id).await.unwrap());

        assert!(store.get_video(drop.id).await.unwrap().is_none());
        assert!(store.latest_summary(drop.id).await.unwrap().is_none());
        assert!(store.highlights_for_video(drop.id).await.unwrap().is_empty());
        assert_eq!(store.highlight_count().await.unwrap(), 1);
        assert_eq!(store.list_videos().await.unwrap().len(), 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(similarity: f32, timestamp: f64) -> RankedResult {
        RankedResult::new(
            Highlight {
                id: 0,
                video_id: 1,
                timestamp,
                end_timestamp: None,
                description: String::new(),
                embedding: vec![],
            },
            "v.mp4".to_string(),
            similarity,
        )
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_euclidean_distance() {
        assert_eq!(euclidean_distance(&[0.0, 3.0], &[4.0, 0.0]), 5.0);
        assert_eq!(euclidean_distance(&[1.0], &[1.0, 2.0]), f32::INFINITY);
    }

    #[test]
    fn test_rank_order_breaks_ties_by_timestamp() {
        let mut results = vec![ranked(0.5, 9.0), ranked(0.9, 3.0), ranked(0.5, 2.0)];
        results.sort_by(rank_order);

        let order: Vec<(f32, f64)> = results
            .iter()
            .map(|r| (r.similarity, r.highlight.timestamp))
            .collect();
        assert_eq!(order, vec![(0.9, 3.0), (0.5, 2.0), (0.5, 9.0)]);
    }

    #[test]
    fn test_modality_filter() {
        let visual = ranked(0.1, 1.0).highlight;
        let mut audio = visual.clone();
        audio.end_timestamp = Some(2.0);

        assert!(ModalityFilter::VisualOnly.matches(&visual));
        assert!(!ModalityFilter::VisualOnly.matches(&audio));
        assert!(ModalityFilter::AudioOnly.matches(&audio));
    }

    #[test]
    fn test_create_store_rejects_unknown_provider() {
        let mut settings = Settings::default();
        settings.vector_store.provider = "pinecone".to_string();
        assert!(matches!(create_store(&settings), Err(GlimtError::Config(_))));
    }

    #[test]
    fn test_create_memory_store() {
        let mut settings = Settings::default();
        settings.vector_store.provider = "memory".to_string();
        let store = create_store(&settings).unwrap();
        assert_eq!(store.dimensions(), 384);
    }
}
