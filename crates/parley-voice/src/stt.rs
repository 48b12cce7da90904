use crate::error::VoiceError;
use crate::providers::{ensure_success, http_client, SpeechToText, Transcription};
use async_trait::async_trait;
use parley_types::SttSettings;
use serde::Deserialize;
use std::time::Duration;

/// Maximum audio input size for STT (10 MiB).
pub const MAX_STT_INPUT_BYTES: usize = 10 * 1024 * 1024;

const STT_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_DEEPGRAM_BASE_URL: &str = "https://api.deepgram.com";

/// How the audio handed to [`DeepgramStt::transcribe`] is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    /// A complete WAV file; Deepgram reads the format from the header.
    Wav,
    /// Headerless 16-bit little-endian mono PCM.
    Linear16 { sample_rate: u32 },
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<ListenChannel>,
}

#[derive(Debug, Deserialize)]
struct ListenChannel {
    #[serde(default)]
    alternatives: Vec<ListenAlternative>,
}

#[derive(Debug, Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    transcript: String,
    confidence: Option<f64>,
}

/// Deepgram pre-recorded transcription client (`/v1/listen`).
#[derive(Debug, Clone)]
pub struct DeepgramStt {
    api_key: String,
    settings: SttSettings,
    encoding: AudioEncoding,
    base_url: String,
    client: reqwest::Client,
}

impl DeepgramStt {
    pub fn new(api_key: impl Into<String>, settings: SttSettings) -> Result<Self, VoiceError> {
        Ok(Self {
            api_key: api_key.into(),
            settings,
            encoding: AudioEncoding::Linear16 { sample_rate: 16_000 },
            base_url: DEFAULT_DEEPGRAM_BASE_URL.to_string(),
            client: http_client(STT_TIMEOUT)?,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_encoding(mut self, encoding: AudioEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    fn build_url(&self) -> String {
        let mut url = format!(
            "{}/v1/listen?model={}&language={}&smart_format={}",
            self.base_url, self.settings.model, self.settings.language, self.settings.smart_format
        );
        if let AudioEncoding::Linear16 { sample_rate } = self.encoding {
            url.push_str(&format!(
                "&encoding=linear16&sample_rate={sample_rate}&channels=1"
            ));
        }
        url
    }

    fn content_type(&self) -> &'static str {
        match self.encoding {
            AudioEncoding::Wav => "audio/wav",
            AudioEncoding::Linear16 { .. } => "application/octet-stream",
        }
    }
}

#[async_trait]
impl SpeechToText for DeepgramStt {
    fn model(&self) -> &str {
        &self.settings.model
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<Transcription, VoiceError> {
        if audio.len() > MAX_STT_INPUT_BYTES {
            return Err(VoiceError::Stt(format!(
                "audio data exceeds maximum size: {} bytes (limit: {} bytes)",
                audio.len(),
                MAX_STT_INPUT_BYTES
            )));
        }

        let response = self
            .client
            .post(self.build_url())
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", self.content_type())
            .body(audio.to_vec())
            .send()
            .await?;

        let parsed: ListenResponse = ensure_success("deepgram", response).await?.json().await?;

        let alternative = parsed
            .results
            .channels
            .into_iter()
            .next()
            .and_then(|channel| channel.alternatives.into_iter().next());

        Ok(match alternative {
            Some(alt) => Transcription {
                text: alt.transcript.trim().to_string(),
                confidence: alt.confidence,
            },
            None => Transcription {
                text: String::new(),
                confidence: None,
            },
        })
    }
}
