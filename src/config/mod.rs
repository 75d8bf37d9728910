//! Configuration module for Glimt.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, CaptionPrompts, Prompts, RoutingPrompts, SummaryPrompts};
pub use settings::{
    AnswerSettings, CaptioningSettings, DistanceMetric, EmbeddingSettings, GeneralSettings,
    PromptSettings, RetrievalSettings, RoutingSettings, SegmentationSettings, Settings,
    TranscriptionSettings, VectorStoreSettings,
};
