//! Agent profile definitions.
//!
//! An `AgentProfile` describes a voice agent: its system instructions and
//! the speech-to-text, language model, and text-to-speech settings it runs
//! with. Profiles are plain data; the voice crate turns them into provider
//! clients.

use serde::{Deserialize, Serialize};

/// Default instructions for the voice assistant persona.
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful voice assistant powered by LiveKit. \
Your interface is voice-based, so keep responses concise and natural. \
Engage in friendly conversation and help users with their questions.";

/// Which remote tracks the agent subscribes to when it joins a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoSubscribe {
    /// Subscribe to every published track.
    SubscribeAll,
    /// Subscribe to nothing automatically.
    SubscribeNone,
    /// Subscribe to audio tracks only.
    #[default]
    AudioOnly,
    /// Subscribe to video tracks only.
    VideoOnly,
}

impl AutoSubscribe {
    /// Whether remote audio reaches the agent under this mode.
    pub fn includes_audio(self) -> bool {
        matches!(self, AutoSubscribe::SubscribeAll | AutoSubscribe::AudioOnly)
    }

    /// Whether the client should subscribe to tracks as they are published.
    pub fn subscribes_on_publish(self) -> bool {
        !matches!(self, AutoSubscribe::SubscribeNone)
    }
}

/// Speech-to-text settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SttSettings {
    /// Deepgram model name.
    pub model: String,
    /// BCP-47 language tag.
    pub language: String,
    /// Whether to ask the provider for punctuation and formatting.
    pub smart_format: bool,
}

impl Default for SttSettings {
    fn default() -> Self {
        Self {
            model: "nova-2".to_string(),
            language: "en-US".to_string(),
            smart_format: true,
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// OpenAI chat model name.
    pub model: String,
    /// Sampling temperature. `None` uses the provider default.
    pub temperature: Option<f64>,
    /// Upper bound on completion tokens. `None` uses the provider default.
    pub max_tokens: Option<u64>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Text-to-speech settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsSettings {
    /// OpenAI speech model name.
    pub model: String,
    /// Voice name, e.g. `alloy`.
    pub voice: String,
    /// Speech speed multiplier (1.0 is normal).
    pub speed: Option<f64>,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            speed: None,
        }
    }
}

/// Complete configuration of a voice agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// System instructions given to the language model.
    pub instructions: String,
    #[serde(default)]
    pub auto_subscribe: AutoSubscribe,
    #[serde(default)]
    pub stt: SttSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub tts: TtsSettings,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            auto_subscribe: AutoSubscribe::default(),
            stt: SttSettings::default(),
            llm: LlmSettings::default(),
            tts: TtsSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_uses_stock_providers() {
        let profile = AgentProfile::default();

        assert_eq!(profile.stt.model, "nova-2");
        assert_eq!(profile.llm.model, "gpt-4o-mini");
        assert_eq!(profile.tts.voice, "alloy");
        assert_eq!(profile.auto_subscribe, AutoSubscribe::AudioOnly);
        assert!(profile.instructions.contains("voice assistant"));
    }

    #[test]
    fn partial_profile_fills_defaults() {
        let profile: AgentProfile = serde_json::from_str(
            r#"{ "instructions": "Be brief.", "tts": { "model": "tts-1-hd", "voice": "nova", "speed": 1.2 } }"#,
        )
        .unwrap();

        assert_eq!(profile.instructions, "Be brief.");
        assert_eq!(profile.tts.voice, "nova");
        assert_eq!(profile.tts.speed, Some(1.2));
        assert_eq!(profile.llm, LlmSettings::default());
        assert_eq!(profile.auto_subscribe, AutoSubscribe::AudioOnly);
    }

    #[test]
    fn subscribe_modes_and_audio() {
        assert!(AutoSubscribe::AudioOnly.includes_audio());
        assert!(AutoSubscribe::SubscribeAll.includes_audio());
        assert!(!AutoSubscribe::VideoOnly.includes_audio());
        assert!(!AutoSubscribe::SubscribeNone.includes_audio());
        assert!(!AutoSubscribe::SubscribeNone.subscribes_on_publish());
        assert!(AutoSubscribe::VideoOnly.subscribes_on_publish());
    }
}
