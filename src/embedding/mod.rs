//! Embedding generation for highlights and queries.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::config::EmbeddingSettings;
use crate::error::{GlimtError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Create the embedder selected in the settings.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    match settings.provider.to_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAIEmbedder::from_settings(settings)?)),
        other => Err(GlimtError::Config(format!(
            "Unknown embedding provider: {}",
            other
        ))),
    }
}
