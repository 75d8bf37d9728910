//! In-memory highlight store implementation.
//!
//! Useful for testing and for throwaway sessions.

use super::{
    check_dimensions, rank_candidates, validate_configured_dimensions, HighlightStore,
    ModalityFilter,
};
use crate::config::DistanceMetric;
use crate::error::{GlimtError, Result};
use crate::models::{
    Highlight, HighlightId, NewHighlight, RankedResult, Video, VideoHighlight, VideoId,
    VideoSummary,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct State {
    videos: Vec<Video>,
    highlights: Vec<Highlight>,
    summaries: Vec<VideoSummary>,
    next_video_id: VideoId,
    next_highlight_id: HighlightId,
    next_summary_id: i64,
}

impl State {
    fn filename(&self, video_id: VideoId) -> String {
        self.videos
            .iter()
            .find(|v| v.id == video_id)
            .map(|v| v.filename.clone())
            .unwrap_or_default()
    }

    fn push_highlight(&mut self, highlight: &NewHighlight) -> Result<HighlightId> {
        if !self.videos.iter().any(|v| v.id == highlight.video_id) {
            return Err(GlimtError::VideoNotFound(highlight.video_id.to_string()));
        }

        self.next_highlight_id += 1;
        let id = self.next_highlight_id;
        self.highlights.push(Highlight {
            id,
            video_id: highlight.video_id,
            timestamp: highlight.timestamp,
            end_timestamp: highlight.end_timestamp,
            description: highlight.description.clone(),
            embedding: highlight.embedding.clone(),
        });
        Ok(id)
    }
}

/// In-memory highlight store.
pub struct MemoryHighlightStore {
    state: RwLock<State>,
    dimensions: usize,
    metric: DistanceMetric,
}

impl MemoryHighlightStore {
    /// Create an empty store.
    pub fn new(dimensions: usize, metric: DistanceMetric) -> Result<Self> {
        validate_configured_dimensions(dimensions)?;
        Ok(Self {
            state: RwLock::new(State::default()),
            dimensions,
            metric,
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| GlimtError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| GlimtError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl HighlightStore for MemoryHighlightStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn insert_video(&self, filename: &str, duration: f64) -> Result<Video> {
        let mut state = self.write()?;
        state.next_video_id += 1;

        let video = Video {
            id: state.next_video_id,
            filename: filename.to_string(),
            duration,
            created_at: Utc::now(),
        };
        state.videos.push(video.clone());
        Ok(video)
    }

    async fn insert_highlight(&self, highlight: &NewHighlight) -> Result<HighlightId> {
        check_dimensions(self.dimensions, &highlight.embedding)?;
        self.write()?.push_highlight(highlight)
    }

    async fn insert_highlights(&self, highlights: &[NewHighlight]) -> Result<usize> {
        let mut state = self.write()?;

        for highlight in highlights {
            check_dimensions(self.dimensions, &highlight.embedding)?;
            if !state.videos.iter().any(|v| v.id == highlight.video_id) {
                return Err(GlimtError::VideoNotFound(highlight.video_id.to_string()));
            }
        }

        for highlight in highlights {
            state.push_highlight(highlight)?;
        }
        Ok(highlights.len())
    }

    async fn insert_summary(&self, video_id: VideoId, summary: &str) -> Result<VideoSummary> {
        let mut state = self.write()?;
        if !state.videos.iter().any(|v| v.id == video_id) {
            return Err(GlimtError::VideoNotFound(video_id.to_string()));
        }

        state.next_summary_id += 1;
        let summary = VideoSummary {
            id: state.next_summary_id,
            video_id,
            summary: summary.to_string(),
            created_at: Utc::now(),
        };
        state.summaries.push(summary.clone());
        Ok(summary)
    }

    async fn latest_summary(&self, video_id: VideoId) -> Result<Option<VideoSummary>> {
        let state = self.read()?;
        Ok(state
            .summaries
            .iter()
            .filter(|s| s.video_id == video_id)
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn nearest_neighbors(
        &self,
        embedding: &[f32],
        filter: ModalityFilter,
        limit: Option<usize>,
    ) -> Result<Vec<RankedResult>> {
        check_dimensions(self.dimensions, embedding)?;
        let state = self.read()?;

        let candidates = state
            .highlights
            .iter()
            .filter(|h| filter.matches(h))
            .map(|h| VideoHighlight {
                highlight: h.clone(),
                filename: state.filename(h.video_id),
            });

        Ok(rank_candidates(embedding, self.metric, candidates, limit))
    }

    async fn highlights_in_range(
        &self,
        video_id: VideoId,
        start: f64,
        end: f64,
        filter: ModalityFilter,
        limit: usize,
    ) -> Result<Vec<VideoHighlight>> {
        let state = self.read()?;

        let mut matches: Vec<&Highlight> = state
            .highlights
            .iter()
            .filter(|h| h.video_id == video_id)
            .filter(|h| h.timestamp >= start && h.timestamp <= end)
            .filter(|h| filter.matches(h))
            .collect();
        matches.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        Ok(matches
            .into_iter()
            .take(limit)
            .map(|h| VideoHighlight {
                highlight: h.clone(),
                filename: state.filename(h.video_id),
            })
            .collect())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut state = self.write()?;
        state.summaries.clear();
        state.highlights.clear();
        state.videos.clear();
        Ok(())
    }

    async fn delete_video(&self, video_id: VideoId) -> Result<bool> {
        let mut state = self.write()?;
        state.summaries.retain(|s| s.video_id != video_id);
        state.highlights.retain(|h| h.video_id != video_id);

        let before = state.videos.len();
        state.videos.retain(|v| v.id != video_id);
        Ok(state.videos.len() < before)
    }

    async fn list_videos(&self) -> Result<Vec<Video>> {
        let mut videos = self.read()?.videos.clone();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(videos)
    }

    async fn get_video(&self, video_id: VideoId) -> Result<Option<Video>> {
        Ok(self.read()?.videos.iter().find(|v| v.id == video_id).cloned())
    }

    async fn highlights_for_video(&self, video_id: VideoId) -> Result<Vec<Highlight>> {
        let state = self.read()?;
        let mut highlights: Vec<Highlight> = state
            .highlights
            .iter()
            .filter(|h| h.video_id == video_id)
            .cloned()
            .collect();
        highlights.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(highlights)
    }

    async fn highlight_count(&self) -> Result<usize> {
        Ok(self.read()?.highlights.len())
    }
}
