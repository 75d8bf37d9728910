//! Pipeline orchestrator for Glimt.
//!
//! Coordinates ingestion (probe, caption, recognize, segment, embed, store)
//! and question answering, and serializes store writes against queries.

use crate::captioning::{caption_frames, Captioner, OpenAICaptioner};
use crate::chunking::SegmentBuilder;
use crate::config::{Prompts, Settings};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{with_timeout, GlimtError, Result};
use crate::media::{extract_audio, extract_frames, probe_video};
use crate::models::{
    AudioSegment, FrameCaption, Modality, NewHighlight, Video, VideoId, VideoSummary, Word,
};
use crate::openai::{create_client_with_timeout, ChatModel};
use crate::rag::{AnswerGenerator, Evidence, QueryEngine, QueryResponse, SummaryGenerator};
use crate::routing::{Classifier, QueryRouter};
use crate::transcription::{SpeechRecognizer, WhisperRecognizer};
use crate::vector_store::{check_dimensions, create_store, HighlightStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// Inputs per embedding request during ingestion.
const EMBED_BATCH: usize = 100;

/// The collaborators the orchestrator drives.
pub struct Components {
    pub store: Arc<dyn HighlightStore>,
    pub embedder: Arc<dyn Embedder>,
    pub captioner: Arc<dyn Captioner>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub classifier: Arc<dyn Classifier>,
    pub answerer: Arc<dyn AnswerGenerator>,
    pub summarizer: Arc<dyn AnswerGenerator>,
}

/// The main orchestrator for the Glimt pipeline.
pub struct Orchestrator {
    settings: Settings,
    store: Arc<dyn HighlightStore>,
    embedder: Arc<dyn Embedder>,
    captioner: Arc<dyn Captioner>,
    recognizer: Arc<dyn SpeechRecognizer>,
    segments: SegmentBuilder,
    summaries: SummaryGenerator,
    engine: QueryEngine,
    /// Held for writing while the store is cleared and repopulated.
    write_gate: RwLock<()>,
    temp_dir: PathBuf,
}

impl Orchestrator {
    /// Create an orchestrator backed by OpenAI models and the configured store.
    pub fn new(settings: Settings) -> Result<Self> {
        // Load prompts (with optional custom directory and variables)
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let classifier = ChatModel::new(
            create_client_with_timeout(settings.routing_timeout())?,
            &settings.routing.model,
        );
        let answerer = ChatModel::new(
            create_client_with_timeout(settings.answer_timeout())?,
            &settings.answer.model,
        )
        .with_temperature(settings.answer.temperature)
        .with_max_tokens(settings.answer.max_tokens);
        let summarizer = ChatModel::new(
            create_client_with_timeout(settings.answer_timeout())?,
            &settings.answer.model,
        )
        .with_temperature(settings.answer.summary_temperature)
        .with_max_tokens(settings.answer.summary_max_tokens);

        let components = Components {
            store: create_store(&settings)?,
            embedder: create_embedder(&settings.embedding)?,
            captioner: Arc::new(OpenAICaptioner::from_settings(
                &settings.captioning,
                prompts.clone(),
            )?),
            recognizer: Arc::new(WhisperRecognizer::from_settings(&settings.transcription)?),
            classifier: Arc::new(classifier),
            answerer: Arc::new(answerer),
            summarizer: Arc::new(summarizer),
        };

        Self::with_components(settings, prompts, components)
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        components: Components,
    ) -> Result<Self> {
        if components.embedder.dimensions() != components.store.dimensions() {
            return Err(GlimtError::DimensionMismatch {
                expected: components.store.dimensions(),
                actual: components.embedder.dimensions(),
            });
        }

        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        let router = QueryRouter::new(
            components.classifier,
            prompts.clone(),
            settings.routing_timeout(),
        );
        let engine = QueryEngine::new(
            &settings,
            prompts.clone(),
            router,
            components.embedder.clone(),
            components.store.clone(),
            components.answerer,
        );
        let summaries =
            SummaryGenerator::new(components.summarizer, prompts, settings.answer_timeout());

        Ok(Self {
            segments: SegmentBuilder::from_settings(&settings.segmentation),
            store: components.store,
            embedder: components.embedder,
            captioner: components.captioner,
            recognizer: components.recognizer,
            summaries,
            engine,
            write_gate: RwLock::new(()),
            temp_dir,
            settings,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a reference to the highlight store.
    pub fn store(&self) -> Arc<dyn HighlightStore> {
        self.store.clone()
    }

    /// Ingest a video file, replacing everything previously stored.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest(&self, path: &Path) -> Result<IngestReport> {
        if !path.is_file() {
            return Err(GlimtError::InvalidInput(format!(
                "Video file not found: {}",
                path.display()
            )));
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video")
            .to_string();

        let probe = probe_video(path).await?;
        let work_dir = tempfile::tempdir_in(&self.temp_dir)?;

        // The two derivation branches share nothing until both finish.
        let (captions, words) = tokio::try_join!(
            self.derive_captions(path, work_dir.path()),
            self.derive_words(path, work_dir.path()),
        )?;

        let report = self
            .ingest_derived(&filename, probe.duration, captions, words)
            .await?;

        drop(work_dir);
        Ok(report)
    }

    async fn derive_captions(&self, video: &Path, work_dir: &Path) -> Result<Vec<FrameCaption>> {
        let frames = extract_frames(video, &work_dir.join("frames")).await?;
        caption_frames(
            self.captioner.as_ref(),
            &frames,
            self.settings.captioning.max_concurrent,
            Duration::from_secs(self.settings.captioning.timeout_seconds),
        )
        .await
    }

    async fn derive_words(&self, video: &Path, work_dir: &Path) -> Result<Vec<Word>> {
        let audio = extract_audio(video, &work_dir.join("audio.mp3")).await?;
        self.recognizer.recognize(&audio).await
    }

    /// Store already-derived captions and words as the only video.
    ///
    /// Embedding and summarizing happen before the store is touched; the
    /// clear-then-repopulate runs under the write gate.
    #[instrument(skip(self, captions, words), fields(captions = captions.len(), words = words.len()))]
    pub async fn ingest_derived(
        &self,
        filename: &str,
        duration: f64,
        captions: Vec<FrameCaption>,
        words: Vec<Word>,
    ) -> Result<IngestReport> {
        let segments = self.segments.build(&words);
        info!(
            "Derived {} captions and {} speech segments",
            captions.len(),
            segments.len()
        );

        let caption_texts: Vec<String> = captions.iter().map(|c| c.description.clone()).collect();
        let segment_texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        let caption_embeddings = self.embed_all(&caption_texts).await?;
        let segment_embeddings = self.embed_all(&segment_texts).await?;

        let summary = self.summarize(duration, &captions, &segments).await;

        let _guard = self.write_gate.write().await;

        // Separate store writes: a failure after the clear is not rolled back.
        self.store.clear_all().await?;
        let video = self.store.insert_video(filename, duration).await?;

        let visual_count = captions.len();
        let audio_count = segments.len();
        let highlights: Vec<NewHighlight> = captions
            .into_iter()
            .zip(caption_embeddings)
            .map(|(caption, embedding)| NewHighlight::visual(video.id, caption, embedding))
            .chain(
                segments
                    .into_iter()
                    .zip(segment_embeddings)
                    .map(|(segment, embedding)| NewHighlight::audio(video.id, segment, embedding)),
            )
            .collect();
        self.store.insert_highlights(&highlights).await?;

        let summary_stored = match summary {
            Some(text) => {
                self.store.insert_summary(video.id, &text).await?;
                true
            }
            None => false,
        };

        info!(
            "Ingested {} as video {} ({} visual, {} audio highlights)",
            filename, video.id, visual_count, audio_count
        );

        Ok(IngestReport {
            video,
            visual_highlights: visual_count,
            audio_highlights: audio_count,
            summary_stored,
        })
    }

    /// Embed texts in bounded requests, checking every vector's length.
    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let timeout = Duration::from_secs(self.settings.embedding.timeout_seconds);
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBED_BATCH) {
            let batch_embeddings =
                with_timeout("embedding", timeout, self.embedder.embed_batch(batch)).await?;
            if batch_embeddings.len() != batch.len() {
                return Err(GlimtError::Embedding(format!(
                    "Requested {} embeddings, received {}",
                    batch.len(),
                    batch_embeddings.len()
                )));
            }
            for embedding in &batch_embeddings {
                check_dimensions(self.store.dimensions(), embedding)?;
            }
            embeddings.extend(batch_embeddings);
        }

        Ok(embeddings)
    }

    async fn summarize(
        &self,
        duration: f64,
        captions: &[FrameCaption],
        segments: &[AudioSegment],
    ) -> Option<String> {
        match self.summaries.generate(duration, captions, segments).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Summary generation failed, continuing without: {}", e);
                None
            }
        }
    }

    /// Resolve an optional scope to a video: the given one, or the newest.
    pub async fn resolve_scope(&self, scope: Option<VideoId>) -> Result<Option<Video>> {
        match scope {
            Some(video_id) => match self.store.get_video(video_id).await? {
                Some(video) => Ok(Some(video)),
                None => Err(GlimtError::VideoNotFound(video_id.to_string())),
            },
            None => self.store.latest_video().await,
        }
    }

    /// Answer a question about a video (the newest when `scope` is `None`).
    #[instrument(skip(self))]
    pub async fn ask(&self, query: &str, scope: Option<VideoId>) -> Result<QueryResponse> {
        let _guard = self.write_gate.read().await;
        let video = self.resolve_scope(scope).await?;
        self.engine.ask(query, video.map(|v| v.id)).await
    }

    /// Retrieve evidence without generating an answer.
    ///
    /// When `modality` is `None` the query is classified first.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        modality: Option<Modality>,
        scope: Option<VideoId>,
    ) -> Result<Evidence> {
        let _guard = self.write_gate.read().await;
        let video = self.resolve_scope(scope).await?;
        let modality = match modality {
            Some(m) => m,
            None => self.engine.classify(query).await,
        };
        self.engine.retrieve(query, modality, video.map(|v| v.id)).await
    }

    /// The stored summary of a video (the newest when `scope` is `None`).
    pub async fn summary(&self, scope: Option<VideoId>) -> Result<Option<VideoSummary>> {
        let _guard = self.write_gate.read().await;
        match self.resolve_scope(scope).await? {
            Some(video) => self.store.latest_summary(video.id).await,
            None => Ok(None),
        }
    }

    /// All videos, newest first.
    pub async fn list_videos(&self) -> Result<Vec<Video>> {
        let _guard = self.write_gate.read().await;
        self.store.list_videos().await
    }

    /// A video with its highlight count.
    pub async fn video_details(&self, video_id: VideoId) -> Result<Option<(Video, usize)>> {
        let _guard = self.write_gate.read().await;
        match self.store.get_video(video_id).await? {
            Some(video) => {
                let count = self.store.highlights_for_video(video_id).await?.len();
                Ok(Some((video, count)))
            }
            None => Ok(None),
        }
    }

    /// Delete a video with its highlights and summaries.
    pub async fn delete_video(&self, video_id: VideoId) -> Result<bool> {
        let _guard = self.write_gate.write().await;
        self.store.delete_video(video_id).await
    }

    /// Remove everything from the store.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_gate.write().await;
        self.store.clear_all().await
    }
}

/// Result of ingesting a video.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// The stored video.
    pub video: Video,
    /// Number of visual highlights stored.
    pub visual_highlights: usize,
    /// Number of audio highlights stored.
    pub audio_highlights: usize,
    /// Whether a summary was generated and stored.
    pub summary_stored: bool,
}
