//! Provider seams for the agent's speech pipeline.
//!
//! The agent only depends on these traits; the concrete clients in
//! [`crate::stt`], [`crate::llm`] and [`crate::tts`] talk to Deepgram and
//! OpenAI over HTTPS, and tests plug in canned implementations.

use crate::error::VoiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of transcribing one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcription {
    pub text: String,
    /// Provider confidence in `[0, 1]`, when reported.
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a chat-completion conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Token accounting reported by the language model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// A finished (non-streaming) completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Model name, for logging.
    fn model(&self) -> &str;

    async fn transcribe(&self, audio: &[u8]) -> Result<Transcription, VoiceError>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model name, for logging.
    fn model(&self) -> &str;

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, VoiceError>;
}

#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Voice name, for logging.
    fn voice(&self) -> &str;

    /// Sample rate of the PCM audio returned by [`TextToSpeech::synthesize`].
    fn sample_rate(&self) -> u32;

    /// Returns raw 16-bit little-endian mono PCM.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError>;
}

/// Builds the HTTP client shared by the provider clients.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, VoiceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(VoiceError::Http)
}

/// Turns a non-2xx provider response into [`VoiceError::Provider`].
pub(crate) async fn ensure_success(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, VoiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(provider, status = status.as_u16(), "provider request failed");
    Err(VoiceError::Provider {
        provider,
        status: status.as_u16(),
        body,
    })
}
