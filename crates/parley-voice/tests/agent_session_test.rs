use async_trait::async_trait;
use parley_types::AutoSubscribe;
use parley_voice::vad::pcm_bytes;
use parley_voice::{
    AgentSession, AudioSink, ChatMessage, ChatRole, Completion, InboundAudio, LanguageModel,
    RoomHandle, SpeechToText, TextToSpeech, TokenUsage, Transcription, VadParams, VoiceAgent,
    VoiceError, AGENT_INPUT_SAMPLE_RATE,
};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast::error::TryRecvError, mpsc};

struct ScriptedStt {
    transcripts: Mutex<Vec<String>>,
}

impl ScriptedStt {
    fn new(transcripts: &[&str]) -> Self {
        let mut queue: Vec<String> = transcripts.iter().map(|t| t.to_string()).collect();
        queue.reverse();
        Self {
            transcripts: Mutex::new(queue),
        }
    }
}

#[async_trait]
impl SpeechToText for ScriptedStt {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn transcribe(&self, _audio: &[u8]) -> Result<Transcription, VoiceError> {
        let text = self.transcripts.lock().unwrap().pop().unwrap_or_default();
        Ok(Transcription {
            text,
            confidence: Some(0.9),
        })
    }
}

/// Echoes the last user message and records every prompt it saw.
#[derive(Default)]
struct EchoLlm {
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
    fail: bool,
}

#[async_trait]
impl LanguageModel for EchoLlm {
    fn model(&self) -> &str {
        "echo"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, VoiceError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        if self.fail {
            return Err(VoiceError::Provider {
                provider: "openai",
                status: 500,
                body: "boom".to_string(),
            });
        }

        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(Completion {
            text: format!("You said: {last}"),
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 4,
                total_tokens: 14,
            }),
        })
    }
}

/// Produces two bytes of PCM per character.
struct CountingTts;

#[async_trait]
impl TextToSpeech for CountingTts {
    fn voice(&self) -> &str {
        "counting"
    }

    fn sample_rate(&self) -> u32 {
        24_000
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        Ok(vec![0u8; text.chars().count() * 2])
    }
}

/// Fails every synthesis request.
struct BrokenTts;

#[async_trait]
impl TextToSpeech for BrokenTts {
    fn voice(&self) -> &str {
        "broken"
    }

    fn sample_rate(&self) -> u32 {
        24_000
    }

    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, VoiceError> {
        Err(VoiceError::Tts("synthesis unavailable".to_string()))
    }
}

/// Collects everything the agent publishes.
#[derive(Default)]
struct RecordingSink {
    published: Mutex<Vec<(usize, u32)>>,
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn publish(&self, pcm: &[u8], sample_rate: u32) -> Result<(), VoiceError> {
        self.published.lock().unwrap().push((pcm.len(), sample_rate));
        Ok(())
    }
}

async fn connect(mode: AutoSubscribe) -> RoomHandle {
    RoomHandle::connect("ws://localhost:7880", "token", "test-room", mode)
        .await
        .expect("connect should succeed")
}

async fn session_with(stt: ScriptedStt, llm: Arc<EchoLlm>) -> AgentSession {
    let agent = VoiceAgent::new(
        "You are a test assistant.",
        Arc::new(stt),
        llm,
        Arc::new(CountingTts),
    );
    AgentSession::start(agent, connect(AutoSubscribe::AudioOnly).await)
        .expect("session should start")
}

/// Half a second of speech followed by a second of silence at the input rate.
fn spoken_utterance() -> Vec<u8> {
    let per_ms = (AGENT_INPUT_SAMPLE_RATE / 1000) as usize;
    let mut samples = vec![6_000i16; per_ms * 500];
    samples.extend(vec![0i16; per_ms * 1_000]);
    pcm_bytes(&samples)
}

#[tokio::test]
async fn test_turn_runs_full_pipeline() {
    let llm = Arc::new(EchoLlm::default());
    let session = session_with(ScriptedStt::new(&["hello agent"]), llm.clone()).await;
    let mut events = session.subscribe_transcriptions();

    let reply = session
        .handle_user_audio(&[1, 2, 3, 4], "test-user")
        .await
        .unwrap()
        .expect("speech should produce a reply");

    assert_eq!(reply.user_text, "hello agent");
    assert_eq!(reply.agent_text, "You said: hello agent");
    assert_eq!(reply.audio_bytes, reply.agent_text.chars().count() * 2);
    assert_eq!(reply.usage.map(|u| u.total_tokens), Some(14));
    assert_eq!(session.room().published_bytes(), reply.audio_bytes as u64);

    let user_event = events.recv().await.unwrap();
    assert_eq!(user_event.role, ChatRole::User);
    assert_eq!(user_event.speaker, "test-user");
    assert_eq!(user_event.room_name, "test-room");

    let agent_event = events.recv().await.unwrap();
    assert_eq!(agent_event.role, ChatRole::Assistant);
    assert_eq!(agent_event.text, "You said: hello agent");

    // The first prompt carried the instructions as the system message.
    let prompts = llm.prompts.lock().unwrap();
    assert_eq!(prompts[0][0], ChatMessage::system("You are a test assistant."));
}

#[tokio::test]
async fn test_history_accumulates_across_turns() {
    let llm = Arc::new(EchoLlm::default());
    let session = session_with(ScriptedStt::new(&["first", "second"]), llm.clone()).await;

    session.handle_user_audio(b"a", "test-user").await.unwrap();
    session.handle_user_audio(b"b", "test-user").await.unwrap();

    let history = session.history().await;
    let roles: Vec<ChatRole> = history.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            ChatRole::System,
            ChatRole::User,
            ChatRole::Assistant,
            ChatRole::User,
            ChatRole::Assistant
        ]
    );
    assert_eq!(llm.prompts.lock().unwrap()[1].len(), 4);
}

#[tokio::test]
async fn test_silence_produces_no_reply() {
    let llm = Arc::new(EchoLlm::default());
    let session = session_with(ScriptedStt::new(&[""]), llm.clone()).await;

    let reply = session.handle_user_audio(b"....", "test-user").await.unwrap();

    assert!(reply.is_none());
    assert!(llm.prompts.lock().unwrap().is_empty());
    assert_eq!(session.history().await.len(), 1);
    assert_eq!(session.room().published_bytes(), 0);
}

#[tokio::test]
async fn test_llm_failure_rolls_back_user_turn() {
    let llm = Arc::new(EchoLlm {
        fail: true,
        ..Default::default()
    });
    let session = session_with(ScriptedStt::new(&["hello"]), llm).await;

    let err = session.handle_user_audio(b"a", "test-user").await.unwrap_err();

    assert!(matches!(err, VoiceError::Provider { status: 500, .. }));
    assert_eq!(session.history().await.len(), 1);
}

#[tokio::test]
async fn test_closed_session_rejects_audio() {
    let session = session_with(ScriptedStt::new(&["hello"]), Arc::new(EchoLlm::default())).await;

    session.close().await;

    assert!(!session.room().is_connected());
    let err = session.handle_user_audio(b"a", "test-user").await.unwrap_err();
    assert!(matches!(err, VoiceError::NotConnected(_)));
}

#[tokio::test]
async fn test_connect_requires_token() {
    let result = RoomHandle::connect("ws://localhost:7880", "", "test-room", AutoSubscribe::AudioOnly).await;
    assert!(matches!(result, Err(VoiceError::Config(_))));
}

#[tokio::test]
async fn test_tts_failure_records_nothing() {
    let agent = VoiceAgent::new(
        "You are a test assistant.",
        Arc::new(ScriptedStt::new(&["hello"])),
        Arc::new(EchoLlm::default()),
        Arc::new(BrokenTts),
    );
    let session = AgentSession::start(agent, connect(AutoSubscribe::AudioOnly).await).unwrap();
    let mut events = session.subscribe_transcriptions();

    let err = session.handle_user_audio(b"a", "test-user").await.unwrap_err();

    assert!(matches!(err, VoiceError::Tts(_)));
    assert_eq!(session.history().await.len(), 1);
    assert_eq!(session.room().published_bytes(), 0);

    // Only the user's words went out; the unspoken reply did not.
    assert_eq!(events.try_recv().unwrap().role, ChatRole::User);
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_history_is_capped() {
    let llm = Arc::new(EchoLlm::default());
    let session = session_with(ScriptedStt::new(&["one", "two", "three"]), llm)
        .await
        .with_history_limit(2);

    for audio in [b"a", b"b", b"c"] {
        session.handle_user_audio(audio, "test-user").await.unwrap();
    }

    let history = session.history().await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[0], ChatMessage::system("You are a test assistant."));
    assert_eq!(history[1], ChatMessage::user("three"));
    assert_eq!(history[2], ChatMessage::assistant("You said: three"));
}

#[tokio::test]
async fn test_run_answers_detected_utterances() {
    let sink = Arc::new(RecordingSink::default());
    let agent = VoiceAgent::new(
        "You are a test assistant.",
        Arc::new(ScriptedStt::new(&["what time is it"])),
        Arc::new(EchoLlm::default()),
        Arc::new(CountingTts),
    );
    let room = connect(AutoSubscribe::AudioOnly).await.with_sink(sink.clone());
    let session = AgentSession::start(agent, room).unwrap();
    let mut events = session.subscribe_transcriptions();

    let (tx, rx) = mpsc::channel(16);
    // 20 ms chunks, the way a media transport delivers frames.
    let chunks: Vec<Vec<u8>> = spoken_utterance().chunks(640).map(<[u8]>::to_vec).collect();
    let producer = tokio::spawn(async move {
        for pcm in chunks {
            let chunk = InboundAudio {
                speaker: "caller".to_string(),
                sample_rate: AGENT_INPUT_SAMPLE_RATE,
                pcm,
            };
            if tx.send(chunk).await.is_err() {
                break;
            }
        }
    });

    session.run(rx, VadParams::default()).await;
    producer.await.unwrap();

    let published = sink.published.lock().unwrap().clone();
    let reply = "You said: what time is it";
    assert_eq!(published, vec![(reply.len() * 2, 24_000)]);

    let user_event = events.recv().await.unwrap();
    assert_eq!(user_event.speaker, "caller");
    assert_eq!(user_event.text, "what time is it");
    assert_eq!(events.recv().await.unwrap().text, reply);
}

#[tokio::test]
async fn test_run_ignores_audio_when_not_subscribed() {
    let llm = Arc::new(EchoLlm::default());
    let agent = VoiceAgent::new(
        "You are a test assistant.",
        Arc::new(ScriptedStt::new(&["hello"])),
        llm.clone(),
        Arc::new(CountingTts),
    );
    let session = AgentSession::start(agent, connect(AutoSubscribe::VideoOnly).await).unwrap();

    let (tx, rx) = mpsc::channel(1);
    tx.send(InboundAudio {
        speaker: "caller".to_string(),
        sample_rate: AGENT_INPUT_SAMPLE_RATE,
        pcm: spoken_utterance(),
    })
    .await
    .unwrap();

    session.run(rx, VadParams::default()).await;

    assert!(llm.prompts.lock().unwrap().is_empty());
    assert_eq!(session.room().published_bytes(), 0);
}
