//! Answer generation over retrieved evidence.
//!
//! Turns the evidence found for a question into a natural-language answer,
//! and summarizes whole videos at ingest time.

pub mod context;
mod response;
mod summary;

pub use context::{Evidence, ResultItem};
pub use response::{QueryEngine, QueryResponse, GENERATION_FAILED, NO_RESULTS, NO_SUMMARY};
pub use summary::SummaryGenerator;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for answer generation services.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate text for a fully rendered prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
