//! Speech recognition with word-level timings.

mod whisper;

pub use whisper::WhisperRecognizer;

use crate::error::Result;
use crate::models::Word;
use async_trait::async_trait;
use std::path::Path;

/// Trait for speech recognition services.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Recognize the speech in an audio file, one entry per word, ordered by start.
    async fn recognize(&self, audio_path: &Path) -> Result<Vec<Word>>;
}

/// Trim word texts, drop empty words and shift by `offset` seconds.
pub(crate) fn normalize_words(words: Vec<Word>, offset: f64) -> Vec<Word> {
    words
        .into_iter()
        .filter_map(|w| {
            let text = w.text.trim();
            (!text.is_empty()).then(|| Word::new(text, w.start + offset, w.end + offset))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_words() {
        let words = vec![
            Word::new(" hello", 0.0, 0.4),
            Word::new("  ", 0.4, 0.5),
            Word::new("world ", 0.6, 1.0),
        ];

        let normalized = normalize_words(words, 600.0);
        assert_eq!(
            normalized,
            vec![Word::new("hello", 600.0, 600.4), Word::new("world", 600.6, 601.0)]
        );
    }
}
