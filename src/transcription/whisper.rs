//! OpenAI Whisper speech recognition with word-level timestamps.

use super::{normalize_words, SpeechRecognizer};
use crate::config::TranscriptionSettings;
use crate::error::{with_timeout, GlimtError, Result};
use crate::media::split_audio;
use crate::models::Word;
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs, TimestampGranularity,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// OpenAI Whisper-based recognizer.
pub struct WhisperRecognizer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    language: Option<String>,
    chunk_duration_seconds: u32,
    max_concurrent_chunks: usize,
    timeout: Duration,
}

impl WhisperRecognizer {
    pub fn from_settings(settings: &TranscriptionSettings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.timeout_seconds);
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: settings.model.clone(),
            language: settings.language.clone(),
            chunk_duration_seconds: settings.chunk_duration_seconds,
            max_concurrent_chunks: settings.max_concurrent_chunks.max(1),
            timeout,
        })
    }

    /// Transcribe a single audio file (no splitting).
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn recognize_single(&self, audio_path: &Path) -> Result<Vec<Word>> {
        let file_bytes = tokio::fs::read(audio_path).await?;

        let mut request_builder = CreateTranscriptionRequestArgs::default();
        request_builder
            .file(AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson)
            .timestamp_granularities(vec![TimestampGranularity::Word]);

        if let Some(lang) = &self.language {
            request_builder.language(lang);
        }

        let request = request_builder
            .build()
            .map_err(|e| GlimtError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = with_timeout(
            "speech recognition",
            self.timeout,
            async {
                self.client
                    .audio()
                    .transcribe_verbose_json(request)
                    .await
                    .map_err(|e| GlimtError::OpenAI(format!("Whisper API error: {}", e)))
            },
        )
        .await?;

        let words: Vec<Word> = response
            .words
            .unwrap_or_default()
            .into_iter()
            .map(|w| Word::new(w.word, w.start as f64, w.end as f64))
            .collect();

        debug!("Recognized {} words", words.len());
        Ok(words)
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperRecognizer {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn recognize(&self, audio_path: &Path) -> Result<Vec<Word>> {
        let temp_dir = tempfile::tempdir()?;
        let chunks = split_audio(audio_path, temp_dir.path(), self.chunk_duration_seconds).await?;

        if chunks.len() == 1 {
            let words = self.recognize_single(audio_path).await?;
            return Ok(normalize_words(words, 0.0));
        }

        info!("Recognizing {} audio chunks with {}", chunks.len(), self.model);

        let mut results: Vec<(usize, f64, Result<Vec<Word>>)> =
            stream::iter(chunks.into_iter().enumerate())
                .map(|(idx, (chunk_path, offset))| async move {
                    let result = self.recognize_single(&chunk_path).await;
                    (idx, offset, result)
                })
                .buffer_unordered(self.max_concurrent_chunks)
                .collect()
                .await;

        // Sort by chunk index and merge
        results.sort_by_key(|(idx, _, _)| *idx);

        let mut all_words = Vec::new();
        let mut errors = Vec::new();
        for (idx, offset, result) in results {
            match result {
                Ok(words) => all_words.extend(normalize_words(words, offset)),
                Err(e) => errors.push(format!("Chunk {} at {:.0}s: {}", idx, offset, e)),
            }
        }

        drop(temp_dir);

        if !errors.is_empty() {
            return Err(GlimtError::Transcription(format!(
                "Speech recognition failed for {} chunk(s):\n{}",
                errors.len(),
                errors.join("\n")
            )));
        }

        Ok(all_words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognizer_from_settings() {
        let settings = TranscriptionSettings {
            language: Some("en".to_string()),
            max_concurrent_chunks: 0,
            ..Default::default()
        };
        let recognizer = WhisperRecognizer::from_settings(&settings).unwrap();
        assert_eq!(recognizer.model, "whisper-1");
        assert_eq!(recognizer.language.as_deref(), Some("en"));
        assert_eq!(recognizer.max_concurrent_chunks, 1);
    }
}
