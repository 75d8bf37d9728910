//! Error types for Glimt.

use thiserror::Error;

/// Library-level error type for Glimt operations.
#[derive(Error, Debug)]
pub enum GlimtError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Media processing failed: {0}")]
    Media(String),

    #[error("Frame captioning failed: {0}")]
    Captioning(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Embedding has {actual} dimensions, store expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Query classification failed: {0}")]
    Classification(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("Timed out after {seconds}s waiting for {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Glimt operations.
pub type Result<T> = std::result::Result<T, GlimtError>;

/// Await `future`, failing with [`GlimtError::Timeout`] once `timeout` elapses.
pub async fn with_timeout<T, F>(operation: &str, timeout: std::time::Duration, future: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(GlimtError::Timeout {
            operation: operation.to_string(),
            seconds: timeout.as_secs(),
        }),
    }
}
