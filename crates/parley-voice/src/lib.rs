//! Voice infrastructure for Parley.
//!
//! Integrates with LiveKit for access tokens and room management, and
//! drives a voice agent through a speech pipeline: Deepgram transcribes
//! what participants say, an OpenAI chat model answers, and OpenAI speech
//! renders the answer back to audio for the room.
//!
//! Provider clients sit behind the traits in [`providers`], so the agent
//! session can be exercised with any implementation.

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod providers;
pub mod service;
pub mod stt;
pub mod tts;
pub mod vad;

pub use agent::{
    AgentReply, AgentSession, AudioSink, InboundAudio, RoomHandle, TranscriptionEvent, VoiceAgent,
    AGENT_INPUT_SAMPLE_RATE, DEFAULT_HISTORY_LIMIT,
};
pub use config::{LiveKitConfig, ProviderKeys};
pub use error::VoiceError;
pub use llm::OpenAiLlm;
pub use providers::{
    ChatMessage, ChatRole, Completion, LanguageModel, SpeechToText, TextToSpeech, TokenUsage,
    Transcription,
};
pub use service::{RoomSettings, VoiceService};
pub use stt::{AudioEncoding, DeepgramStt};
pub use tts::OpenAiTts;
pub use vad::{UtteranceDetector, VadParams};
