//! Shared plumbing for the Parley command-line tools.
//!
//! Three binaries live in this crate: the `parley-agent` worker,
//! `generate-token` for minting a participant token by hand, and
//! `test-room` for creating a throwaway room against a live deployment.
//!
//! The worker only exchanges audio with a room when built with the
//! `livekit` feature, which links the LiveKit WebRTC client.

#[cfg(feature = "livekit")]
pub mod transport;

use parley_voice::{InboundAudio, LiveKitConfig, RoomHandle, VoiceError, VoiceService};
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Room the agent joins when `AGENT_ROOM` is unset.
pub const DEFAULT_ROOM: &str = "test-room";
/// Identity suggested by `generate-token`.
pub const DEFAULT_IDENTITY: &str = "test-user";
/// Identity the agent worker joins with.
pub const AGENT_IDENTITY: &str = "voice-agent";
pub const AGENT_ROOM_VAR: &str = "AGENT_ROOM";

/// Room created by `test-room`.
pub const TEST_ROOM_NAME: &str = "test-voice-agent-room";
pub const TEST_PARTICIPANT_IDENTITY: &str = "test-participant-1";
pub const TEST_PARTICIPANT_NAME: &str = "Test User";

const RULE_WIDTH: usize = 80;

/// Installs the fmt subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Asks `question` on `output` and reads one line from `input`.
///
/// Blank input (or end of input) yields `default`.
pub fn prompt_with_default<R, W>(
    input: &mut R,
    output: &mut W,
    question: &str,
    default: &str,
) -> io::Result<String>
where
    R: BufRead,
    W: Write,
{
    write!(output, "{question} (press Enter for '{default}'): ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let answer = line.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

/// Mints a token whose display name equals the identity.
pub fn mint_token(
    config: LiveKitConfig,
    room_name: &str,
    identity: &str,
) -> Result<String, VoiceError> {
    VoiceService::new(config).generate_join_token(room_name, identity, identity)
}

/// Human-readable block printed by `generate-token`.
pub fn token_banner(room_name: &str, identity: &str, token: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!(
        "\n{rule}\n\
         LiveKit Access Token Generated!\n\
         {rule}\n\
         \n\
         Room Name: {room_name}\n\
         Participant: {identity}\n\
         \n\
         Token:\n\
         {token}\n\
         \n\
         {rule}\n\
         \n\
         To test:\n\
         1. Open a LiveKit client (e.g. the LiveKit Meet playground)\n\
         2. Paste this token in the 'Access Token' field\n\
         3. Connect to the room\n\
         4. Start speaking!\n\
         {rule}\n"
    )
}

/// Shortens a token for log output.
pub fn token_preview(token: &str, max_chars: usize) -> String {
    match token.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &token[..cut]),
        None => token.to_string(),
    }
}

/// Steps logged by `test-room` once the room is ready.
pub fn test_instructions(token: &str) -> Vec<String> {
    vec![
        "1. Make sure parley-server is running".to_string(),
        "2. Configure LiveKit to send webhooks to the handler's /webhook endpoint".to_string(),
        "3. Connect to the room using a LiveKit client".to_string(),
        format!("4. Use this token to join: {}", token_preview(token, 50)),
        "5. Watch the parley-server logs for incoming events".to_string(),
        "6. Visit http://localhost:8080/logs to see all logged events".to_string(),
    ]
}

/// The agent's audio connection to a room.
pub struct MediaLink {
    inbound: Option<mpsc::Receiver<InboundAudio>>,
    #[cfg(feature = "livekit")]
    transport: transport::LiveKitTransport,
}

impl MediaLink {
    /// Remote participant audio; `None` once taken.
    pub fn take_inbound(&mut self) -> Option<mpsc::Receiver<InboundAudio>> {
        self.inbound.take()
    }

    pub async fn close(self) {
        #[cfg(feature = "livekit")]
        self.transport.close().await;
    }
}

/// Joins the room's media session when a transport is compiled in.
///
/// Returns `None` for the link otherwise: the agent then holds its join
/// token but neither hears nor speaks.
pub async fn attach_media(
    room: RoomHandle,
    url: &str,
    token: &str,
) -> Result<(RoomHandle, Option<MediaLink>), VoiceError> {
    #[cfg(feature = "livekit")]
    {
        let (room, transport, inbound) = transport::LiveKitTransport::join(room, url, token).await?;
        Ok((
            room,
            Some(MediaLink {
                inbound: Some(inbound),
                transport,
            }),
        ))
    }

    #[cfg(not(feature = "livekit"))]
    {
        let _ = (url, token);
        tracing::warn!(
            room = room.room_name(),
            "built without the `livekit` feature, the agent does no media I/O"
        );
        Ok((room, None))
    }
}

/// Settings for the agent worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    pub room_name: String,
    pub identity: String,
}

impl AgentSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let room_name = lookup(AGENT_ROOM_VAR)
            .map(|room| room.trim().to_string())
            .filter(|room| !room.is_empty())
            .unwrap_or_else(|| DEFAULT_ROOM.to_string());

        Self {
            room_name,
            identity: AGENT_IDENTITY.to_string(),
        }
    }
}
