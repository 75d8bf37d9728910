//! Question answering over retrieved evidence.

use super::context::{Evidence, ResultItem};
use super::AnswerGenerator;
use crate::config::{Prompts, Settings};
use crate::embedding::Embedder;
use crate::error::{with_timeout, Result};
use crate::models::{Modality, RankedResult, VideoId};
use crate::retrieval::{AdaptiveResultFilter, SimilaritySearcher, TemporalFusionJoiner};
use crate::routing::QueryRouter;
use crate::vector_store::{HighlightStore, ModalityFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Returned when no summary exists for the video in scope.
pub const NO_SUMMARY: &str = "No summary available for this video.";

/// Returned when retrieval finds nothing to answer from.
pub const NO_RESULTS: &str =
    "I couldn't find any relevant moments in this video for your question.";

/// Returned when the answer collaborator fails.
pub const GENERATION_FAILED: &str =
    "I apologize, but I encountered an error while generating the response. Please try again.";

/// Answer to a question, with the evidence it was based on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub data_type_used: Modality,
    pub response: String,
    pub results: Vec<ResultItem>,
}

/// Routes, retrieves and answers questions about ingested videos.
pub struct QueryEngine {
    router: QueryRouter,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn HighlightStore>,
    visual_searcher: SimilaritySearcher,
    audio_searcher: SimilaritySearcher,
    gap_filter: AdaptiveResultFilter,
    fusion: TemporalFusionJoiner,
    generator: Arc<dyn AnswerGenerator>,
    prompts: Prompts,
    embedding_timeout: Duration,
    answer_timeout: Duration,
}

impl QueryEngine {
    pub fn new(
        settings: &Settings,
        prompts: Prompts,
        router: QueryRouter,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn HighlightStore>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            router,
            visual_searcher: SimilaritySearcher::new(store.clone())
                .with_limit(settings.retrieval.visual_limit),
            audio_searcher: SimilaritySearcher::new(store.clone()),
            gap_filter: AdaptiveResultFilter::from_settings(&settings.retrieval),
            fusion: TemporalFusionJoiner::from_settings(store.clone(), &settings.retrieval),
            embedder,
            store,
            generator,
            prompts,
            embedding_timeout: Duration::from_secs(settings.embedding.timeout_seconds),
            answer_timeout: settings.answer_timeout(),
        }
    }

    /// Classify a question.
    pub async fn classify(&self, query: &str) -> Modality {
        self.router.classify(query).await
    }

    /// Gather evidence for `query` from the given modality.
    ///
    /// Summary evidence needs a `scope`; without one it is treated as missing.
    #[instrument(skip(self))]
    pub async fn retrieve(
        &self,
        query: &str,
        modality: Modality,
        scope: Option<VideoId>,
    ) -> Result<Evidence> {
        let evidence = match modality {
            Modality::Summary => {
                let summary = match scope {
                    Some(video_id) => self.store.latest_summary(video_id).await?.map(|s| s.summary),
                    None => None,
                };
                Evidence::Summary(summary)
            }
            Modality::Visual => {
                let embedding = self.embed_query(query).await?;
                Evidence::Visual(
                    self.visual_searcher
                        .search(&embedding, ModalityFilter::VisualOnly)
                        .await?,
                )
            }
            Modality::Audio => {
                let embedding = self.embed_query(query).await?;
                Evidence::Audio(self.search_audio(&embedding).await?)
            }
            Modality::Both => {
                let embedding = self.embed_query(query).await?;
                let segments = self.search_audio(&embedding).await?;
                Evidence::Fused(self.fusion.fuse(segments).await?)
            }
        };

        Ok(evidence)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        with_timeout(
            "query embedding",
            self.embedding_timeout,
            self.embedder.embed(query),
        )
        .await
    }

    async fn search_audio(&self, embedding: &[f32]) -> Result<Vec<RankedResult>> {
        let candidates = self
            .audio_searcher
            .search(embedding, ModalityFilter::AudioOnly)
            .await?;
        Ok(self.gap_filter.filter(candidates))
    }

    /// Answer a question about the video in `scope`.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn ask(&self, query: &str, scope: Option<VideoId>) -> Result<QueryResponse> {
        let modality = self.classify(query).await;
        info!("Answering from {} evidence", modality);

        let evidence = self.retrieve(query, modality, scope).await?;
        self.answer(query, evidence).await
    }

    /// Turn evidence into a response, calling the answer collaborator if
    /// there is anything to answer from.
    pub async fn answer(&self, query: &str, evidence: Evidence) -> Result<QueryResponse> {
        let modality = evidence.modality();
        let results = evidence.result_items();

        let response = if evidence.is_empty() {
            debug!("No evidence for {} query", modality);
            match modality {
                Modality::Summary => NO_SUMMARY.to_string(),
                _ => NO_RESULTS.to_string(),
            }
        } else {
            let prompt = self.build_prompt(query, &evidence);
            match with_timeout(
                "answer generation",
                self.answer_timeout,
                self.generator.generate(&prompt),
            )
            .await
            {
                Ok(answer) => answer,
                Err(e) => {
                    warn!("Answer generation failed: {}", e);
                    GENERATION_FAILED.to_string()
                }
            }
        };

        Ok(QueryResponse {
            query: query.to_string(),
            data_type_used: modality,
            response,
            results,
        })
    }

    /// Render the modality-specific answer prompt.
    pub fn build_prompt(&self, query: &str, evidence: &Evidence) -> String {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());

        let template = match evidence {
            Evidence::Visual(_) => &self.prompts.answer.visual,
            Evidence::Audio(_) => &self.prompts.answer.audio,
            Evidence::Fused(_) => &self.prompts.answer.fused,
            Evidence::Summary(_) => &self.prompts.answer.summary,
        };

        let key = match evidence {
            Evidence::Summary(_) => "summary",
            _ => "context",
        };
        vars.insert(key.to_string(), evidence.prompt_context());

        self.prompts.render_with_custom(template, &vars)
    }
}
