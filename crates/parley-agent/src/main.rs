//! Parley voice agent worker.
//!
//! Joins the configured LiveKit room as `voice-agent` and runs a
//! Deepgram + OpenAI voice session until SIGINT/SIGTERM. Audio is only
//! exchanged with the room when built with the `livekit` feature.

use parley_agent::{attach_media, init_tracing, AgentSettings, MediaLink};
use parley_types::AgentProfile;
use parley_voice::{
    AgentSession, LiveKitConfig, ProviderKeys, RoomHandle, RoomSettings, VadParams, VoiceAgent,
    VoiceError, VoiceService,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

async fn start_session(
    settings: &AgentSettings,
    profile: &AgentProfile,
) -> Result<(AgentSession, Option<MediaLink>), VoiceError> {
    let config = LiveKitConfig::from_env()?;
    let keys = ProviderKeys::from_env()?;
    let url = config.require_url()?.to_string();
    let service = VoiceService::new(config);

    tracing::info!(room = %settings.room_name, "starting agent for room");

    // Joining creates the room on demand if this fails.
    if let Err(e) = service
        .create_room(&settings.room_name, RoomSettings::default())
        .await
    {
        tracing::warn!(room = %settings.room_name, error = %e, "could not pre-create room");
    }

    let token = service.generate_join_token(
        &settings.room_name,
        &settings.identity,
        &settings.identity,
    )?;
    let room = RoomHandle::connect(&url, &token, &settings.room_name, profile.auto_subscribe).await?;
    let (room, media) = attach_media(room, &url, &token).await?;
    let agent = VoiceAgent::from_profile(profile, &keys)?;

    Ok((AgentSession::start(agent, room)?, media))
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = AgentSettings::from_env();
    let profile = AgentProfile::default();

    let (session, mut media) = match start_session(&settings, &profile).await {
        Ok((session, media)) => (Arc::new(session), media),
        Err(e) => {
            tracing::error!(error = %e, "failed to start agent");
            std::process::exit(1);
        }
    };

    let mut transcriptions = session.subscribe_transcriptions();
    tokio::spawn(async move {
        loop {
            match transcriptions.recv().await {
                Ok(event) => tracing::info!(
                    room = %event.room_name,
                    speaker = %event.speaker,
                    role = ?event.role,
                    text = %event.text,
                    "transcription"
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "transcription log lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    match media.as_mut().and_then(MediaLink::take_inbound) {
        Some(inbound) => {
            let listener = Arc::clone(&session);
            tokio::spawn(async move { listener.run(inbound, VadParams::default()).await });
            tracing::info!("Voice assistant is now active and listening");
        }
        None => {
            tracing::info!("Voice assistant is active without media I/O, it will not hear or speak");
        }
    }

    shutdown_signal().await;
    session.close().await;
    if let Some(link) = media {
        link.close().await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down agent"),
        () = terminate => tracing::info!("received SIGTERM, shutting down agent"),
    }
}
