//! Core data model shared by ingestion, storage and retrieval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a stored video.
pub type VideoId = i64;

/// Identifier of a stored highlight.
pub type HighlightId = i64;

// ============================================================================
// Ingestion Types
// ============================================================================

/// A single spoken word with timing from the speech recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// The word text.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

/// A bounded run of consecutive words, indexed as one audio highlight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSegment {
    /// Word texts joined with single spaces.
    pub text: String,
    /// Start of the first word.
    pub start_timestamp: f64,
    /// End of the last word.
    pub end_timestamp: f64,
    /// Number of words in the run.
    pub word_count: usize,
}

/// A caption for one sampled video second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameCaption {
    /// Second of the video the frame was sampled at.
    pub timestamp: f64,
    /// Caption text.
    pub description: String,
}

// ============================================================================
// Stored Types
// ============================================================================

/// Which kind of evidence a highlight carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    /// One sampled video second, no end timestamp.
    Visual,
    /// A speech segment spanning `timestamp..end_timestamp`.
    Audio,
}

impl HighlightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightKind::Visual => "visual",
            HighlightKind::Audio => "audio",
        }
    }
}

/// A stored, embedded piece of evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: HighlightId,
    pub video_id: VideoId,
    /// Start time in seconds.
    pub timestamp: f64,
    /// End time in seconds; present only for audio highlights.
    pub end_timestamp: Option<f64>,
    pub description: String,
    pub embedding: Vec<f32>,
}

impl Highlight {
    pub fn kind(&self) -> HighlightKind {
        if self.end_timestamp.is_some() {
            HighlightKind::Audio
        } else {
            HighlightKind::Visual
        }
    }

    pub fn is_audio(&self) -> bool {
        self.kind() == HighlightKind::Audio
    }

    pub fn is_visual(&self) -> bool {
        self.kind() == HighlightKind::Visual
    }

    /// Format the start timestamp for display.
    pub fn format_timestamp(&self) -> String {
        format_timestamp(self.timestamp)
    }
}

/// A highlight that has not been written to the store yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHighlight {
    pub video_id: VideoId,
    pub timestamp: f64,
    pub end_timestamp: Option<f64>,
    pub description: String,
    pub embedding: Vec<f32>,
}

impl NewHighlight {
    /// A visual highlight for one sampled second.
    pub fn visual(video_id: VideoId, caption: FrameCaption, embedding: Vec<f32>) -> Self {
        Self {
            video_id,
            timestamp: caption.timestamp,
            end_timestamp: None,
            description: caption.description,
            embedding,
        }
    }

    /// An audio highlight covering a speech segment.
    pub fn audio(video_id: VideoId, segment: AudioSegment, embedding: Vec<f32>) -> Self {
        Self {
            video_id,
            timestamp: segment.start_timestamp,
            end_timestamp: Some(segment.end_timestamp),
            description: segment.text,
            embedding,
        }
    }
}

/// An ingested video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: VideoId,
    pub filename: String,
    /// Duration in seconds, derived from the decoded frame count.
    pub duration: f64,
    pub created_at: DateTime<Utc>,
}

/// A generated whole-video summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub id: i64,
    pub video_id: VideoId,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Query-time Types
// ============================================================================

/// A highlight together with the filename of the video it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoHighlight {
    pub highlight: Highlight,
    pub filename: String,
}

/// A highlight scored against a query.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub highlight: Highlight,
    pub filename: String,
    /// `1 - distance`, in `[0, 1]`. Higher is better.
    pub similarity: f32,
}

impl RankedResult {
    pub fn new(highlight: Highlight, filename: String, similarity: f32) -> Self {
        Self {
            highlight,
            filename,
            similarity,
        }
    }
}

/// An audio segment with the visual highlights shown while it was spoken.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedSegment {
    pub audio_segment: RankedResult,
    pub related_visuals: Vec<RankedResult>,
    pub timestamp: f64,
    pub end_timestamp: f64,
}

/// Which evidence a query should be answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// What can be seen.
    Visual,
    /// What was said.
    Audio,
    /// The whole-video summary.
    Summary,
    /// Speech segments with the visuals around them.
    Both,
}

impl Modality {
    pub const ALL: [Modality; 4] = [
        Modality::Visual,
        Modality::Audio,
        Modality::Summary,
        Modality::Both,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Visual => "visual",
            Modality::Audio => "audio",
            Modality::Summary => "summary",
            Modality::Both => "both",
        }
    }
}

impl std::str::FromStr for Modality {
    type Err = String;

    /// Exact label match; callers trim and lower-case first.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Modality::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("Unknown modality: {}", s))
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
