use crate::error::VoiceError;
use crate::llm::DEFAULT_OPENAI_BASE_URL;
use crate::providers::{ensure_success, http_client, TextToSpeech};
use async_trait::async_trait;
use parley_types::TtsSettings;
use serde::Serialize;
use std::time::Duration;

/// Maximum text input size for TTS (64 KiB).
pub const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

const TTS_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI `pcm` output is fixed at 24 kHz.
const OPENAI_PCM_SAMPLE_RATE: u32 = 24_000;

/// Body sent to `/v1/audio/speech`.
#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f64>,
}

/// OpenAI text-to-speech client returning 24 kHz mono PCM.
#[derive(Debug, Clone)]
pub struct OpenAiTts {
    api_key: String,
    settings: TtsSettings,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiTts {
    pub fn new(api_key: impl Into<String>, settings: TtsSettings) -> Result<Self, VoiceError> {
        Ok(Self {
            api_key: api_key.into(),
            settings,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            client: http_client(TTS_TIMEOUT)?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl TextToSpeech for OpenAiTts {
    fn voice(&self) -> &str {
        &self.settings.voice
    }

    fn sample_rate(&self) -> u32 {
        OPENAI_PCM_SAMPLE_RATE
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VoiceError::Tts(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }

        let url = format!("{}/v1/audio/speech", self.base_url);
        let body = SpeechRequest {
            model: &self.settings.model,
            input: text,
            voice: &self.settings.voice,
            response_format: "pcm",
            speed: self.settings.speed,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let audio = ensure_success("openai", response).await?.bytes().await?;
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn oversized_text_is_rejected_before_sending() {
        let tts = OpenAiTts::new("key", TtsSettings::default())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let text = "a".repeat(MAX_TTS_INPUT_BYTES + 1);

        let err = tts.synthesize(&text).await.unwrap_err();
        assert!(matches!(err, VoiceError::Tts(_)));
    }

    #[test]
    fn request_uses_pcm_output() {
        let body = SpeechRequest {
            model: "tts-1",
            input: "Hello there",
            voice: "alloy",
            response_format: "pcm",
            speed: None,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["voice"], "alloy");
        assert_eq!(json["response_format"], "pcm");
        assert!(json.get("speed").is_none());
    }
}
