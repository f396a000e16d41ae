use crate::config::GeneratorConfig;
use crate::error::VoiceError;
use crate::prompt::load_system_prompt;
use async_trait::async_trait;
use dsva_types::ConversationTurn;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Produces the next assistant utterance from a conversation transcript.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// `history` excludes the system prompt; implementations supply their own.
    async fn generate(&self, history: &[ConversationTurn]) -> Result<String, VoiceError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<&'a ConversationTurn>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generator backed by an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
    system_prompt: ConversationTurn,
}

impl OpenAiGenerator {
    /// Builds the HTTP client with the configured request timeout and loads
    /// the system prompt.
    pub fn new(config: GeneratorConfig) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {}", e)))?;
        let prompt = load_system_prompt(config.system_prompt_path.as_deref().map(Path::new));

        Ok(Self {
            client,
            config,
            system_prompt: ConversationTurn::system(prompt),
        })
    }

    /// Replaces the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = ConversationTurn::system(prompt);
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt.content
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ResponseGenerator for OpenAiGenerator {
    async fn generate(&self, history: &[ConversationTurn]) -> Result<String, VoiceError> {
        if self.config.api_key.is_empty() {
            return Err(VoiceError::Config(
                "OpenAI API key is not configured. Set llm.api_key in config \
                 or the OPENAI_API_KEY environment variable."
                    .to_string(),
            ));
        }

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(&self.system_prompt);
        messages.extend(history.iter());

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        tracing::debug!(
            model = %self.config.model,
            turns = history.len(),
            "requesting chat completion"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Upstream(format!(
                "chat completion returned {}: {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| VoiceError::Upstream("chat completion had no content".to_string()))?;

        Ok(content.trim().to_string())
    }
}
