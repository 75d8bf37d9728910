//! Prompt templates for Glimt.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory:
//! `routing.toml`, `caption.toml`, `answer.toml` and `summary.toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub routing: RoutingPrompts,
    pub caption: CaptionPrompts,
    pub answer: AnswerPrompts,
    pub summary: SummaryPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Rubric for the query classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingPrompts {
    pub classifier: String,
}

impl Default for RoutingPrompts {
    fn default() -> Self {
        Self {
            classifier: r#"You are helping a video analysis system decide which type of data to search to answer a user's question.

The video has been processed into:
1. VISUAL DATA: descriptions of what can be seen each second (people, objects, actions, scenes, clothing, expressions)
2. AUDIO DATA: speech-to-text segments of what was said (dialogue, narration)
3. SUMMARY DATA: a summary of the entire video (main topics, key points, overall narrative)

Choose "summary" for GENERAL questions about the whole video:
- "What is this video about?"
- "Summarize this video"
- "Give me an overview"

Choose "visual" ONLY for questions about what can be SEEN:
- "What is the man wearing?"
- "How many people are in the scene?"
- "What objects are visible?"

Choose "audio" ONLY for questions about what was SAID or HEARD:
- "What did he say?"
- "What was mentioned about the budget?"
- "What was the dialogue?"

Choose "both" for questions about a SPECIFIC MOMENT that need what was seen and said together:
- "What happened when he mentioned Athens?"
- "Describe the scene when she said goodbye"

USER QUESTION: "{{query}}"

Respond with EXACTLY ONE word: summary, visual, audio, or both

Answer:"#
                .to_string(),
        }
    }
}

/// Prompts for frame captioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionPrompts {
    pub system: String,
    pub user: String,
}

impl Default for CaptionPrompts {
    fn default() -> Self {
        Self {
            system: "You caption single video frames for a search index. Describe only what is visible, in one plain sentence of 10 to 25 words. Mention people, clothing, objects, actions and setting. Never speculate about sound or speech.".to_string(),
            user: "Caption this frame from second {{timestamp}} of the video.".to_string(),
        }
    }
}

/// Prompts for answering a question from retrieved evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub visual: String,
    pub audio: String,
    pub fused: String,
    pub summary: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            visual: r#"You are a video analysis assistant specializing in visual content. Analyze what can be seen in video frames: objects, people, actions and scenes.

The following are visual descriptions from specific moments in the video:

{{context}}

USER QUESTION: {{query}}

Based on these visual observations, give a factual answer about what was seen:"#
                .to_string(),

            audio: r#"You are a video analysis assistant specializing in speech. Analyze what was said in the video and in what context.

The following are speech segments from the video with their timestamps:

{{context}}

USER QUESTION: {{query}}

Based on these speech segments, give a factual answer about what was said:"#
                .to_string(),

            fused: r#"You are a video analysis assistant. Explain what happened in a video by combining what was spoken with what was visible.

Audio and visual entries that share a time period are connected: they show what the speaker was saying while those things were on screen.

{{context}}

USER QUESTION: {{query}}

Based on this synchronized audio-visual information, give a factual answer that connects what was said with what was seen:"#
                .to_string(),

            summary: r#"You are a video analysis assistant with access to a comprehensive summary of a video. Answer the user's question using this summary.

COMPREHENSIVE VIDEO SUMMARY:
{{summary}}

USER QUESTION: {{query}}

If the question asks for general information, give an overview. If it asks for specific details, focus on those aspects of the summary."#
                .to_string(),
        }
    }
}

/// Prompt for whole-video summary generation at ingest time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    pub user: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            user: r#"You are a video summarization expert. Create a comprehensive summary of this video.

VIDEO METADATA:
- Duration: {{duration}} seconds
- Total visual scenes: {{visual_count}}
- Total speech segments: {{audio_count}}

COMPLETE AUDIO TRANSCRIPT:
{{transcript}}

VISUAL SCENES THROUGHOUT VIDEO:
{{scenes}}

Provide a summary that covers:
1. Main topic and theme
2. Key points discussed or presented
3. Visual context and setting
4. Overall narrative, message, or purpose

Keep the summary informative but concise (2-3 paragraphs maximum)."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let routing_path = custom_path.join("routing.toml");
            if routing_path.exists() {
                prompts.routing = toml::from_str(&std::fs::read_to_string(&routing_path)?)?;
            }

            let caption_path = custom_path.join("caption.toml");
            if caption_path.exists() {
                prompts.caption = toml::from_str(&std::fs::read_to_string(&caption_path)?)?;
            }

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                prompts.answer = toml::from_str(&std::fs::read_to_string(&answer_path)?)?;
            }

            let summary_path = custom_path.join("summary.toml");
            if summary_path.exists() {
                prompts.summary = toml::from_str(&std::fs::read_to_string(&summary_path)?)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.routing.classifier.contains("{{query}}"));
        assert!(prompts.answer.fused.contains("{{context}}"));
        assert!(prompts.answer.summary.contains("{{summary}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut prompts = Prompts::default();
        prompts.variables.insert("tone".to_string(), "formal".to_string());
        prompts.variables.insert("query".to_string(), "ignored".to_string());

        let mut vars = HashMap::new();
        vars.insert("query".to_string(), "what was said?".to_string());

        let rendered = prompts.render_with_custom("{{tone}}: {{query}}", &vars);
        assert_eq!(rendered, "formal: what was said?");
    }

    #[test]
    fn test_custom_dir_overrides_routing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("routing.toml"),
            "classifier = \"Label {{query}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.routing.classifier, "Label {{query}}");
        assert!(!prompts.answer.visual.is_empty());
    }
}
