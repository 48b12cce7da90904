//! Shared types for the Parley voice agent toolkit.
//!
//! This crate holds the serde types that cross crate boundaries: the
//! fields extracted from inbound LiveKit webhooks and the agent profile
//! describing which STT, LLM, and TTS providers a voice agent runs with.
//!
//! It depends only on `serde` and `serde_json` so that the server and the voice
//! crates can share definitions without pulling in each other's stacks.

pub mod agent;
pub mod webhook;

pub use agent::{AgentProfile, AutoSubscribe, LlmSettings, SttSettings, TtsSettings};
pub use webhook::{is_empty_payload, ExtractedFields, ParticipantSummary, RoomSummary};
