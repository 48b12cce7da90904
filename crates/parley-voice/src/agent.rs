use crate::config::ProviderKeys;
use crate::error::VoiceError;
use crate::llm::OpenAiLlm;
use crate::providers::{
    ChatMessage, ChatRole, LanguageModel, SpeechToText, TextToSpeech, TokenUsage,
};
use crate::stt::DeepgramStt;
use crate::tts::OpenAiTts;
use crate::vad::{UtteranceDetector, VadParams};
use async_trait::async_trait;
use parley_types::{AgentProfile, AutoSubscribe};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};

/// Default capacity for the per-session transcription broadcast channel.
const DEFAULT_TRANSCRIPTION_BROADCAST_CAPACITY: usize = 256;

/// User and assistant messages kept in the chat history, besides the
/// system prompt. Older turns are dropped in pairs.
pub const DEFAULT_HISTORY_LIMIT: usize = 40;

/// Sample rate inbound participant audio is expected at. Matches the
/// default [`DeepgramStt`] encoding.
pub const AGENT_INPUT_SAMPLE_RATE: u32 = 16_000;

/// Event emitted for every finished user or agent turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionEvent {
    pub room_name: String,
    pub speaker: String,
    pub role: ChatRole,
    pub text: String,
}

/// A chunk of mono PCM16 audio from one remote participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundAudio {
    pub speaker: String,
    pub sample_rate: u32,
    pub pcm: Vec<u8>,
}

/// Where published agent audio goes. Implemented by the media transport.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn publish(&self, pcm: &[u8], sample_rate: u32) -> Result<(), VoiceError>;
}

/// The agent's membership in a LiveKit room.
///
/// Holds the room name and subscription mode the agent joined with. Audio
/// published through the handle goes to the attached [`AudioSink`]; without
/// one it is only counted.
pub struct RoomHandle {
    room_name: String,
    auto_subscribe: AutoSubscribe,
    connected: AtomicBool,
    published_bytes: AtomicU64,
    sink: Option<Arc<dyn AudioSink>>,
}

impl std::fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHandle")
            .field("room_name", &self.room_name)
            .field("auto_subscribe", &self.auto_subscribe)
            .field("connected", &self.is_connected())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl RoomHandle {
    pub async fn connect(
        url: &str,
        token: &str,
        room_name: &str,
        auto_subscribe: AutoSubscribe,
    ) -> Result<Self, VoiceError> {
        if token.is_empty() {
            return Err(VoiceError::Config(
                "a join token is required to connect".to_string(),
            ));
        }

        info!(
            room = room_name,
            url,
            token_len = token.len(),
            ?auto_subscribe,
            "agent connecting to LiveKit room"
        );

        Ok(Self {
            room_name: room_name.to_string(),
            auto_subscribe,
            connected: AtomicBool::new(true),
            published_bytes: AtomicU64::new(0),
            sink: None,
        })
    }

    /// Routes published audio to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    pub fn auto_subscribe(&self) -> AutoSubscribe {
        self.auto_subscribe
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Total PCM bytes published so far.
    pub fn published_bytes(&self) -> u64 {
        self.published_bytes.load(Ordering::SeqCst)
    }

    /// Publishes PCM audio data to the room.
    pub async fn publish_audio(&self, pcm_data: &[u8], sample_rate: u32) -> Result<(), VoiceError> {
        if !self.is_connected() {
            return Err(VoiceError::NotConnected(self.room_name.clone()));
        }

        debug!(
            room = %self.room_name,
            bytes = pcm_data.len(),
            sample_rate,
            "agent publishing audio"
        );
        if let Some(sink) = &self.sink {
            sink.publish(pcm_data, sample_rate).await?;
        }
        self.published_bytes
            .fetch_add(pcm_data.len() as u64, Ordering::SeqCst);
        Ok(())
    }

    pub async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!(room = %self.room_name, "agent disconnecting from room");
        }
    }
}

/// A voice agent: instructions plus the three providers it speaks through.
pub struct VoiceAgent {
    instructions: String,
    stt: Arc<dyn SpeechToText>,
    llm: Arc<dyn LanguageModel>,
    tts: Arc<dyn TextToSpeech>,
}

impl std::fmt::Debug for VoiceAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceAgent")
            .field("stt", &self.stt.model())
            .field("llm", &self.llm.model())
            .field("tts", &self.tts.voice())
            .finish()
    }
}

impl VoiceAgent {
    pub fn new(
        instructions: impl Into<String>,
        stt: Arc<dyn SpeechToText>,
        llm: Arc<dyn LanguageModel>,
        tts: Arc<dyn TextToSpeech>,
    ) -> Self {
        Self {
            instructions: instructions.into(),
            stt,
            llm,
            tts,
        }
    }

    /// Builds the stock Deepgram + OpenAI agent described by `profile`.
    pub fn from_profile(profile: &AgentProfile, keys: &ProviderKeys) -> Result<Self, VoiceError> {
        let stt = DeepgramStt::new(&keys.deepgram_api_key, profile.stt.clone())?;
        let llm = OpenAiLlm::new(&keys.openai_api_key, profile.llm.clone())?;
        let tts = OpenAiTts::new(&keys.openai_api_key, profile.tts.clone())?;

        Ok(Self::new(
            profile.instructions.clone(),
            Arc::new(stt),
            Arc::new(llm),
            Arc::new(tts),
        ))
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }
}

/// What the agent said back for one user utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub user_text: String,
    pub agent_text: String,
    pub audio_bytes: usize,
    pub usage: Option<TokenUsage>,
}

/// A running conversation between a [`VoiceAgent`] and one room.
#[derive(Debug)]
pub struct AgentSession {
    agent: VoiceAgent,
    room: RoomHandle,
    history: Mutex<Vec<ChatMessage>>,
    history_limit: usize,
    transcription_tx: broadcast::Sender<TranscriptionEvent>,
}

impl AgentSession {
    /// Starts a session; the chat history is seeded with the agent's instructions.
    pub fn start(agent: VoiceAgent, room: RoomHandle) -> Result<Self, VoiceError> {
        if !room.is_connected() {
            return Err(VoiceError::NotConnected(room.room_name().to_string()));
        }

        let (tx, _) = broadcast::channel(DEFAULT_TRANSCRIPTION_BROADCAST_CAPACITY);
        info!(
            room = room.room_name(),
            stt = agent.stt.model(),
            llm = agent.llm.model(),
            tts = agent.tts.voice(),
            "agent session started"
        );

        Ok(Self {
            history: Mutex::new(vec![ChatMessage::system(agent.instructions.clone())]),
            history_limit: DEFAULT_HISTORY_LIMIT,
            agent,
            room,
            transcription_tx: tx,
        })
    }

    /// Caps the messages kept after the system prompt. Odd limits round up
    /// so user and assistant turns stay paired.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        let limit = limit.max(2);
        self.history_limit = limit + limit % 2;
        self
    }

    pub fn room(&self) -> &RoomHandle {
        &self.room
    }

    /// Subscribes to transcription events from this session.
    pub fn subscribe_transcriptions(&self) -> broadcast::Receiver<TranscriptionEvent> {
        self.transcription_tx.subscribe()
    }

    /// Snapshot of the conversation so far, system prompt first.
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().await.clone()
    }

    /// Runs one user turn: transcribe, complete, synthesize, publish.
    ///
    /// Returns `Ok(None)` when the audio held no speech. A turn is recorded
    /// in the history only once its reply was published; concurrent turns
    /// are serialized on the history.
    pub async fn handle_user_audio(
        &self,
        audio: &[u8],
        speaker: &str,
    ) -> Result<Option<AgentReply>, VoiceError> {
        if !self.room.is_connected() {
            return Err(VoiceError::NotConnected(self.room.room_name().to_string()));
        }

        let transcription = self.agent.stt.transcribe(audio).await?;
        if transcription.text.is_empty() {
            debug!(speaker, "no speech detected, skipping turn");
            return Ok(None);
        }

        let mut history = self.history.lock().await;
        history.push(ChatMessage::user(transcription.text.clone()));
        self.emit(speaker, ChatRole::User, &transcription.text);

        let spoken = match self.agent.llm.complete(&history).await {
            Ok(completion) => self
                .speak(&completion.text)
                .await
                .map(|audio_bytes| (completion, audio_bytes)),
            Err(e) => Err(e),
        };
        let (completion, audio_bytes) = match spoken {
            Ok(spoken) => spoken,
            Err(e) => {
                // Drop the unanswered user turn.
                history.pop();
                return Err(e);
            }
        };

        history.push(ChatMessage::assistant(completion.text.clone()));
        trim_history(&mut history, self.history_limit);
        drop(history);

        self.emit("agent", ChatRole::Assistant, &completion.text);

        info!(
            room = self.room.room_name(),
            speaker,
            reply_chars = completion.text.len(),
            audio_bytes,
            "agent turn complete"
        );

        Ok(Some(AgentReply {
            user_text: transcription.text,
            agent_text: completion.text,
            audio_bytes,
            usage: completion.usage,
        }))
    }

    /// Consumes participant audio until `inbound` closes or the room is left,
    /// answering every utterance the detector finds.
    ///
    /// A failed turn is logged and the session keeps listening.
    pub async fn run(&self, mut inbound: mpsc::Receiver<InboundAudio>, vad: VadParams) {
        if !self.room.auto_subscribe().includes_audio() {
            warn!(
                room = self.room.room_name(),
                mode = ?self.room.auto_subscribe(),
                "subscription mode excludes audio, agent will not listen"
            );
            return;
        }

        let mut detectors: HashMap<String, (u32, UtteranceDetector)> = HashMap::new();

        while let Some(chunk) = inbound.recv().await {
            if !self.room.is_connected() {
                break;
            }

            let (rate, detector) = detectors
                .entry(chunk.speaker.clone())
                .or_insert_with(|| (chunk.sample_rate, UtteranceDetector::new(vad, chunk.sample_rate)));
            if *rate != chunk.sample_rate {
                *rate = chunk.sample_rate;
                *detector = UtteranceDetector::new(vad, chunk.sample_rate);
            }

            for utterance in detector.push(&chunk.pcm) {
                debug!(speaker = %chunk.speaker, bytes = utterance.len(), "utterance detected");
                if let Err(e) = self.handle_user_audio(&utterance, &chunk.speaker).await {
                    warn!(speaker = %chunk.speaker, error = %e, "agent turn failed");
                }
            }
        }

        debug!(room = self.room.room_name(), "inbound audio ended");
    }

    /// Ends the session and leaves the room.
    pub async fn close(&self) {
        self.room.disconnect().await;
        info!(room = self.room.room_name(), "agent session closed");
    }

    async fn speak(&self, text: &str) -> Result<usize, VoiceError> {
        let audio = self.agent.tts.synthesize(text).await?;
        self.room
            .publish_audio(&audio, self.agent.tts.sample_rate())
            .await?;
        Ok(audio.len())
    }

    fn emit(&self, speaker: &str, role: ChatRole, text: &str) {
        // No subscribers is fine.
        let _ = self.transcription_tx.send(TranscriptionEvent {
            room_name: self.room.room_name().to_string(),
            speaker: speaker.to_string(),
            role,
            text: text.to_string(),
        });
    }
}

/// Keeps the system prompt and the newest `limit` messages.
fn trim_history(history: &mut Vec<ChatMessage>, limit: usize) {
    let kept = history.len().saturating_sub(1);
    if kept > limit {
        history.drain(1..1 + kept - limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(turns: usize) -> Vec<ChatMessage> {
        let mut history = vec![ChatMessage::system("sys")];
        for i in 0..turns {
            history.push(ChatMessage::user(format!("q{i}")));
            history.push(ChatMessage::assistant(format!("a{i}")));
        }
        history
    }

    #[test]
    fn trim_keeps_system_prompt_and_newest_turns() {
        let mut history = conversation(5);

        trim_history(&mut history, 4);

        assert_eq!(history.len(), 5);
        assert_eq!(history[0], ChatMessage::system("sys"));
        assert_eq!(history[1], ChatMessage::user("q3"));
        assert_eq!(history[4], ChatMessage::assistant("a4"));
    }

    #[test]
    fn trim_below_limit_is_noop() {
        let mut history = conversation(2);

        trim_history(&mut history, 40);

        assert_eq!(history, conversation(2));
    }
}
