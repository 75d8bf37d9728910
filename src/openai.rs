//! OpenAI client configuration and the chat-completion adapter.

use crate::error::{GlimtError, Result};
use crate::rag::AnswerGenerator;
use crate::routing::Classifier;
use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with the default timeout.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// A chat model used for single-turn completions.
///
/// Serves both as the query classifier and as the answer generator.
pub struct ChatModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatModel {
    pub fn new(client: Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature: 0.0,
            max_tokens: 16,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one user message and return the reply text.
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| GlimtError::OpenAI(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(|e| GlimtError::OpenAI(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| GlimtError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GlimtError::OpenAI("Empty response from LLM".to_string()))?;

        debug!("Completion returned {} chars", content.len());
        Ok(content)
    }
}

#[async_trait]
impl Classifier for ChatModel {
    async fn classify(&self, prompt: &str) -> Result<String> {
        self.complete(prompt)
            .await
            .map_err(|e| GlimtError::Classification(e.to_string()))
    }
}

#[async_trait]
impl AnswerGenerator for ChatModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.complete(prompt)
            .await
            .map(|text| text.trim().to_string())
            .map_err(|e| GlimtError::Generation(e.to_string()))
    }
}
