use crate::error::VoiceError;
use crate::providers::{
    ensure_success, http_client, ChatMessage, Completion, LanguageModel, TokenUsage,
};
use async_trait::async_trait;
use parley_types::LlmSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

const LLM_TIMEOUT: Duration = Duration::from_secs(90);

/// Body sent to `/v1/chat/completions`.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat-completion client. Calls are one-shot (`stream: false`).
#[derive(Debug, Clone)]
pub struct OpenAiLlm {
    api_key: String,
    settings: LlmSettings,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiLlm {
    pub fn new(api_key: impl Into<String>, settings: LlmSettings) -> Result<Self, VoiceError> {
        Ok(Self {
            api_key: api_key.into(),
            settings,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            client: http_client(LLM_TIMEOUT)?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl LanguageModel for OpenAiLlm {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, VoiceError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &self.settings.model,
            messages,
            stream: false,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let parsed: ChatCompletionResponse =
            ensure_success("openai", response).await?.json().await?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| VoiceError::Llm("completion contained no message content".to_string()))?;

        Ok(Completion {
            text,
            usage: parsed.usage,
        })
    }
}
