//! Configuration settings for Glimt.

use crate::error::{GlimtError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub captioning: CaptioningSettings,
    pub transcription: TranscriptionSettings,
    pub segmentation: SegmentationSettings,
    pub retrieval: RetrievalSettings,
    pub routing: RoutingSettings,
    pub answer: AnswerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files (sampled frames, extracted audio).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.glimt".to_string(),
            temp_dir: "/tmp/glimt".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions. Every stored highlight must match.
    pub dimensions: usize,
    /// Timeout for one embedding request, in seconds.
    pub timeout_seconds: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 384,
            timeout_seconds: 60,
        }
    }
}

/// Distance used for nearest-neighbor ranking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cos(a, b)`.
    #[default]
    Cosine,
    /// Euclidean distance.
    L2,
}

impl DistanceMetric {
    /// Similarity of two vectors, `1 - distance` clamped to `[0, 1]`.
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        let distance = match self {
            DistanceMetric::Cosine => 1.0 - crate::vector_store::cosine_similarity(a, b),
            DistanceMetric::L2 => crate::vector_store::euclidean_distance(a, b),
        };
        (1.0 - distance).clamp(0.0, 1.0)
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            _ => Err(format!("Unknown distance metric: {}", s)),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
    /// Distance metric; must match the embedding model's geometry.
    pub metric: DistanceMetric,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.glimt/highlights.db".to_string(),
            metric: DistanceMetric::Cosine,
        }
    }
}

/// Frame captioning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptioningSettings {
    /// Vision model used to caption sampled frames.
    pub model: String,
    /// Image detail level sent to the vision model (low, high, auto).
    pub detail: String,
    /// Maximum concurrent caption requests.
    pub max_concurrent: usize,
    /// Maximum tokens per caption.
    pub max_tokens: u32,
    /// Timeout for one caption request, in seconds.
    pub timeout_seconds: u64,
}

impl Default for CaptioningSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            detail: "low".to_string(),
            max_concurrent: 4,
            max_tokens: 60,
            timeout_seconds: 60,
        }
    }
}

/// Speech recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model used for word-level timestamps.
    pub model: String,
    /// Optional language hint (ISO-639-1).
    pub language: Option<String>,
    /// Duration in seconds for splitting long audio files.
    pub chunk_duration_seconds: u32,
    /// Maximum concurrent chunk requests.
    pub max_concurrent_chunks: usize,
    /// Timeout for one transcription request, in seconds.
    pub timeout_seconds: u64,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            language: None,
            chunk_duration_seconds: 600,
            max_concurrent_chunks: 2,
            timeout_seconds: 300,
        }
    }
}

/// Speech segmentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationSettings {
    /// Maximum words per audio segment.
    pub max_words: usize,
    /// A silence longer than this (seconds) always starts a new segment.
    pub max_gap_seconds: f64,
}

impl Default for SegmentationSettings {
    fn default() -> Self {
        Self {
            max_words: 8,
            max_gap_seconds: 2.0,
        }
    }
}

/// Ranking, gap filtering and temporal fusion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Top-k for visual-only searches.
    pub visual_limit: usize,
    /// Largest similarity drop tolerated between consecutive audio results.
    pub gap_threshold: f32,
    /// Maximum audio results kept by the gap filter.
    pub max_audio_results: usize,
    /// Seconds added on both sides of an audio segment when fusing visuals.
    pub fusion_padding_seconds: f64,
    /// Window length used when an audio segment has no end timestamp.
    pub fusion_default_window_seconds: f64,
    /// Maximum visuals attached to one audio segment.
    pub fusion_max_visuals: usize,
    /// Similarity reported for time-matched visuals.
    pub time_matched_similarity: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            visual_limit: 5,
            gap_threshold: 0.05,
            max_audio_results: 2,
            fusion_padding_seconds: 2.0,
            fusion_default_window_seconds: 5.0,
            fusion_max_visuals: 3,
            time_matched_similarity: 0.8,
        }
    }
}

/// Query routing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    /// LLM model used to classify queries.
    pub model: String,
    /// Timeout for the classifier call, in seconds. Expiry falls back to "both".
    pub timeout_seconds: u64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 20,
        }
    }
}

/// Answer and summary generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerSettings {
    /// LLM model for answers and video summaries.
    pub model: String,
    /// Sampling temperature for answers.
    pub temperature: f32,
    /// Maximum tokens per answer.
    pub max_tokens: u32,
    /// Sampling temperature for video summaries.
    pub summary_temperature: f32,
    /// Maximum tokens per video summary.
    pub summary_max_tokens: u32,
    /// Timeout for one generation call, in seconds.
    pub timeout_seconds: u64,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.6,
            max_tokens: 400,
            summary_temperature: 0.4,
            summary_max_tokens: 600,
            timeout_seconds: 120,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

/// Keys that are absent from a serialized config while unset.
const OPTIONAL_KEYS: [&str; 2] = ["transcription.language", "prompts.custom_dir"];

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the retrieval engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimensions == 0 {
            return Err(GlimtError::Config(
                "embedding.dimensions must be greater than zero".to_string(),
            ));
        }
        if self.retrieval.gap_threshold < 0.0 {
            return Err(GlimtError::Config(
                "retrieval.gap_threshold must not be negative".to_string(),
            ));
        }
        if self.retrieval.fusion_padding_seconds < 0.0
            || self.retrieval.fusion_default_window_seconds < 0.0
        {
            return Err(GlimtError::Config(
                "retrieval fusion windows must not be negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.retrieval.time_matched_similarity) {
            return Err(GlimtError::Config(
                "retrieval.time_matched_similarity must be within [0, 1]".to_string(),
            ));
        }
        if self.segmentation.max_gap_seconds < 0.0 {
            return Err(GlimtError::Config(
                "segmentation.max_gap_seconds must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| GlimtError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("glimt")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    pub fn routing_timeout(&self) -> Duration {
        Duration::from_secs(self.routing.timeout_seconds)
    }

    pub fn answer_timeout(&self) -> Duration {
        Duration::from_secs(self.answer.timeout_seconds)
    }

    /// Return a copy with `section.field` set to `value`.
    ///
    /// The value is read as a TOML literal when it parses as one (numbers,
    /// booleans), otherwise as a plain string.
    pub fn with_value(&self, key: &str, value: &str) -> Result<Self> {
        let (section, field) = key.split_once('.').ok_or_else(|| {
            GlimtError::Config(format!("Expected a key like 'section.field', got '{}'", key))
        })?;

        let mut document = toml::Value::try_from(self)
            .map_err(|e| GlimtError::Config(e.to_string()))?;

        let table = document
            .get_mut(section)
            .and_then(|s| s.as_table_mut())
            .ok_or_else(|| GlimtError::Config(format!("Unknown config section: {}", section)))?;
        if !table.contains_key(field) && !OPTIONAL_KEYS.contains(&key) {
            return Err(GlimtError::Config(format!("Unknown config key: {}", key)));
        }

        let parsed = format!("v = {}", value)
            .parse::<toml::Table>()
            .ok()
            .and_then(|mut t| t.remove("v"))
            .unwrap_or_else(|| toml::Value::String(value.to_string()));
        table.insert(field.to_string(), parsed);

        let updated = document
            .try_into::<Settings>()
            .map_err(|e: toml::de::Error| GlimtError::Config(format!("Invalid value for {}: {}", key, e)))?;
        updated.validate()?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.embedding.dimensions, 384);
        assert_eq!(settings.segmentation.max_words, 8);
        assert_eq!(settings.retrieval.max_audio_results, 2);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let mut settings = Settings::default();
        settings.embedding.dimensions = 0;
        assert!(matches!(settings.validate(), Err(GlimtError::Config(_))));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [retrieval]
            gap_threshold = 0.1

            [vector_store]
            metric = "l2"
            "#,
        )
        .unwrap();

        assert_eq!(settings.retrieval.gap_threshold, 0.1);
        assert_eq!(settings.retrieval.max_audio_results, 2);
        assert_eq!(settings.vector_store.metric, DistanceMetric::L2);
        assert_eq!(settings.embedding.model, "text-embedding-3-small");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.answer.model = "gpt-4.1".to_string();
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.answer.model, "gpt-4.1");
    }

    #[test]
    fn test_metric_similarity_is_clamped() {
        let a = [1.0, 0.0];
        let b = [-1.0, 0.0];
        assert_eq!(DistanceMetric::Cosine.similarity(&a, &b), 0.0);
        assert_eq!(DistanceMetric::L2.similarity(&a, &b), 0.0);
        assert!((DistanceMetric::L2.similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_with_value() {
        let settings = Settings::default();

        let updated = settings.with_value("retrieval.gap_threshold", "0.1").unwrap();
        assert_eq!(updated.retrieval.gap_threshold, 0.1);

        let updated = settings.with_value("answer.model", "gpt-4.1").unwrap();
        assert_eq!(updated.answer.model, "gpt-4.1");

        let updated = settings.with_value("transcription.language", "no").unwrap();
        assert_eq!(updated.transcription.language.as_deref(), Some("no"));
    }

    #[test]
    fn test_with_value_rejects_bad_input() {
        let settings = Settings::default();
        assert!(settings.with_value("gap_threshold", "0.1").is_err());
        assert!(settings.with_value("retrieval.nope", "1").is_err());
        assert!(settings.with_value("embedding.dimensions", "0").is_err());
        assert!(settings.with_value("segmentation.max_words", "many").is_err());
    }
}
