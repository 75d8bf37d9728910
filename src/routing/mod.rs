//! Query routing.
//!
//! Decides which evidence a question should be answered from by asking a
//! text classifier, falling back to [`Modality::Both`] whenever the answer
//! cannot be trusted.

use crate::config::Prompts;
use crate::error::{with_timeout, Result};
use crate::models::Modality;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Single-shot text classifier.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Return the raw label text for a fully rendered prompt.
    async fn classify(&self, prompt: &str) -> Result<String>;
}

/// Classifies questions into a [`Modality`].
pub struct QueryRouter {
    classifier: Arc<dyn Classifier>,
    prompts: Prompts,
    timeout: Duration,
}

impl QueryRouter {
    pub fn new(classifier: Arc<dyn Classifier>, prompts: Prompts, timeout: Duration) -> Self {
        Self {
            classifier,
            prompts,
            timeout,
        }
    }

    /// Classify `query`. Never fails: any problem yields [`Modality::Both`].
    #[instrument(skip(self))]
    pub async fn classify(&self, query: &str) -> Modality {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.routing.classifier, &vars);

        let raw = match with_timeout(
            "query classification",
            self.timeout,
            self.classifier.classify(&prompt),
        )
        .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Classifier failed, searching both modalities: {}", e);
                return Modality::Both;
            }
        };

        match Self::parse_label(&raw) {
            Some(modality) => {
                debug!("Routed query to {}", modality);
                modality
            }
            None => {
                warn!("Unrecognized classifier label {:?}, searching both modalities", raw);
                Modality::Both
            }
        }
    }

    /// Trim and lower-case a raw label; `None` unless it is exactly one modality.
    pub fn parse_label(raw: &str) -> Option<Modality> {
        raw.trim().to_lowercase().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GlimtError;
    use std::sync::Mutex;

    struct FixedClassifier {
        reply: Result<String>,
        prompts_seen: Mutex<Vec<String>>,
    }

    impl FixedClassifier {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts_seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(GlimtError::Classification("service unavailable".to_string())),
                prompts_seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(&self, prompt: &str) -> Result<String> {
            self.prompts_seen.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(label) => Ok(label.clone()),
                Err(e) => Err(GlimtError::Classification(e.to_string())),
            }
        }
    }

    struct SlowClassifier;

    #[async_trait]
    impl Classifier for SlowClassifier {
        async fn classify(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("visual".to_string())
        }
    }

    fn router(classifier: Arc<dyn Classifier>) -> QueryRouter {
        QueryRouter::new(classifier, Prompts::default(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_unrecognized_label_falls_back_to_both() {
        let modality = router(FixedClassifier::replying("maybe"))
            .classify("what is he wearing?")
            .await;
        assert_eq!(modality, Modality::Both);
    }

    #[tokio::test]
    async fn test_classifier_error_falls_back_to_both() {
        let modality = router(FixedClassifier::failing()).classify("anything").await;
        assert_eq!(modality, Modality::Both);
    }

    #[tokio::test]
    async fn test_label_is_trimmed_and_lowercased() {
        let modality = router(FixedClassifier::replying("  Visual\n"))
            .classify("what is he wearing?")
            .await;
        assert_eq!(modality, Modality::Visual);
    }

    #[tokio::test]
    async fn test_each_label_is_accepted() {
        for expected in Modality::ALL {
            let modality = router(FixedClassifier::replying(expected.as_str()))
                .classify("q")
                .await;
            assert_eq!(modality, expected);
        }
    }

    #[tokio::test]
    async fn test_prompt_contains_query() {
        let classifier = FixedClassifier::replying("audio");
        router(classifier.clone())
            .classify("what was said about the budget?")
            .await;

        let seen = classifier.prompts_seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("USER QUESTION: \"what was said about the budget?\""));
        assert!(!seen[0].contains("{{query}}"));
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_both() {
        let router = QueryRouter::new(
            Arc::new(SlowClassifier),
            Prompts::default(),
            Duration::from_millis(50),
        );
        assert_eq!(router.classify("what is he wearing?").await, Modality::Both);
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(QueryRouter::parse_label("summary"), Some(Modality::Summary));
        assert_eq!(QueryRouter::parse_label(" AUDIO "), Some(Modality::Audio));
        assert_eq!(QueryRouter::parse_label("visual."), None);
        assert_eq!(QueryRouter::parse_label("audio and visual"), None);
        assert_eq!(QueryRouter::parse_label(""), None);
    }
}
