//! OpenAI vision captioning implementation.

use super::Captioner;
use crate::config::{CaptioningSettings, Prompts};
use crate::error::{GlimtError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    ChatCompletionRequestMessageContentPartImageArgs, ChatCompletionRequestMessageContentPartTextArgs,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
    ImageUrlArgs,
};
use async_trait::async_trait;
use base64::Engine as _;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

/// Captions frames with a vision-capable chat model.
pub struct OpenAICaptioner {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    detail: ImageDetail,
    max_tokens: u32,
    prompts: Prompts,
}

impl OpenAICaptioner {
    pub fn from_settings(settings: &CaptioningSettings, prompts: Prompts) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(Duration::from_secs(settings.timeout_seconds))?,
            model: settings.model.clone(),
            detail: parse_detail(&settings.detail),
            max_tokens: settings.max_tokens,
            prompts,
        })
    }
}

fn parse_detail(detail: &str) -> ImageDetail {
    match detail.to_lowercase().as_str() {
        "high" => ImageDetail::High,
        "auto" => ImageDetail::Auto,
        _ => ImageDetail::Low,
    }
}

/// Encode an image file as a `data:` URL.
pub(crate) fn data_url(path: &Path, bytes: &[u8]) -> String {
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    };
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[async_trait]
impl Captioner for OpenAICaptioner {
    #[instrument(skip(self), fields(frame = %frame.display()))]
    async fn caption(&self, frame: &Path, timestamp: f64) -> Result<String> {
        let bytes = tokio::fs::read(frame).await?;

        let mut vars = HashMap::new();
        vars.insert("timestamp".to_string(), format!("{:.0}", timestamp));
        let instruction = self.prompts.render_with_custom(&self.prompts.caption.user, &vars);

        let parts: Vec<ChatCompletionRequestUserMessageContentPart> = vec![
            ChatCompletionRequestMessageContentPartTextArgs::default()
                .text(instruction)
                .build()
                .map_err(|e| GlimtError::Captioning(e.to_string()))?
                .into(),
            ChatCompletionRequestMessageContentPartImageArgs::default()
                .image_url(
                    ImageUrlArgs::default()
                        .url(data_url(frame, &bytes))
                        .detail(self.detail.clone())
                        .build()
                        .map_err(|e| GlimtError::Captioning(e.to_string()))?,
                )
                .build()
                .map_err(|e| GlimtError::Captioning(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(self.prompts.caption.system.clone())
                    .build()
                    .map_err(|e| GlimtError::Captioning(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(parts)
                    .build()
                    .map_err(|e| GlimtError::Captioning(e.to_string()))?
                    .into(),
            ])
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(|e| GlimtError::Captioning(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| GlimtError::OpenAI(format!("Vision API error: {}", e)))?;

        let caption = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!("Captioned frame at {:.0}s", timestamp);
        Ok(caption.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url() {
        let url = data_url(Path::new("frame_00001.jpg"), b"abc");
        assert_eq!(url, "data:image/jpeg;base64,YWJj");

        let url = data_url(Path::new("shot.PNG"), b"");
        assert_eq!(url, "data:image/png;base64,");
    }

    #[test]
    fn test_parse_detail() {
        assert!(matches!(parse_detail("HIGH"), ImageDetail::High));
        assert!(matches!(parse_detail("auto"), ImageDetail::Auto));
        assert!(matches!(parse_detail("whatever"), ImageDetail::Low));
    }
}
