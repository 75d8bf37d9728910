//! Nearest-neighbour ranking over stored highlights.

use crate::error::Result;
use crate::models::RankedResult;
use crate::vector_store::{rank_order, HighlightStore, ModalityFilter};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Ranks the highlights of one modality against a query embedding.
pub struct SimilaritySearcher {
    store: Arc<dyn HighlightStore>,
    limit: Option<usize>,
}

impl SimilaritySearcher {
    /// Uncapped searcher.
    pub fn new(store: Arc<dyn HighlightStore>) -> Self {
        Self { store, limit: None }
    }

    /// Keep at most `limit` results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Results most similar first, ties by ascending timestamp.
    #[instrument(skip(self, query_embedding))]
    pub async fn search(
        &self,
        query_embedding: &[f32],
        filter: ModalityFilter,
    ) -> Result<Vec<RankedResult>> {
        let mut results = self
            .store
            .nearest_neighbors(query_embedding, filter, self.limit)
            .await?;

        // Independent of adapter ordering.
        results.sort_by(rank_order);

        debug!("Search returned {} results", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceMetric;
    use crate::vector_store::test_support::{audio, embedding, visual};
    use crate::vector_store::MemoryHighlightStore;

    async fn seeded() -> Arc<dyn HighlightStore> {
        let store = MemoryHighlightStore::new(4, DistanceMetric::Cosine).unwrap();
        let video = store.insert_video("demo.mp4", 20.0).await.unwrap();
        store
            .insert_highlights(&[
                visual(video.id, 4.0, "a red car", embedding(4, 0, 0.1)),
                visual(video.id, 1.0, "a red bus", embedding(4, 0, 0.1)),
                visual(video.id, 2.0, "a tree", embedding(4, 2, 0.0)),
                audio(video.id, 0.0, 2.5, "look at that car", embedding(4, 0, 0.3)),
                audio(video.id, 5.0, 7.0, "it is raining", embedding(4, 3, 0.0)),
            ])
            .await
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_visual_filter_excludes_audio() {
        let searcher = SimilaritySearcher::new(seeded().await);
        let results = searcher
            .search(&embedding(4, 0, 0.0), ModalityFilter::VisualOnly)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.highlight.end_timestamp.is_none()));
    }

    #[tokio::test]
    async fn test_ties_break_by_timestamp() {
        let searcher = SimilaritySearcher::new(seeded().await);
        let results = searcher
            .search(&embedding(4, 0, 0.0), ModalityFilter::VisualOnly)
            .await
            .unwrap();

        // Same embedding, so equal similarity.
        assert_eq!(results[0].highlight.timestamp, 1.0);
        assert_eq!(results[1].highlight.timestamp, 4.0);
        assert_eq!(results[2].highlight.description, "a tree");
    }

    #[tokio::test]
    async fn test_audio_search_is_uncapped_by_default() {
        let searcher = SimilaritySearcher::new(seeded().await);
        let results = searcher
            .search(&embedding(4, 0, 0.0), ModalityFilter::AudioOnly)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].highlight.description, "look at that car");
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[tokio::test]
    async fn test_soft_limit() {
        let searcher = SimilaritySearcher::new(seeded().await).with_limit(1);
        let results = searcher
            .search(&embedding(4, 0, 0.0), ModalityFilter::VisualOnly)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_store_yields_no_results() {
        let store = Arc::new(MemoryHighlightStore::new(4, DistanceMetric::Cosine).unwrap());
        let results = SimilaritySearcher::new(store)
            .search(&embedding(4, 0, 0.0), ModalityFilter::AudioOnly)
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
