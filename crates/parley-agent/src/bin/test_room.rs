//! Creates a test room, mints a participant token and keeps the process
//! alive so webhook delivery can be observed.

use parley_agent::{
    init_tracing, test_instructions, TEST_PARTICIPANT_IDENTITY, TEST_PARTICIPANT_NAME,
    TEST_ROOM_NAME,
};
use parley_voice::{LiveKitConfig, RoomSettings, VoiceError, VoiceService};
use std::time::Duration;

const KEEP_ALIVE: Duration = Duration::from_secs(300);

async fn run(service: &VoiceService) -> Result<(), VoiceError> {
    tracing::info!(room = TEST_ROOM_NAME, "creating room");

    let room = service
        .create_room(
            TEST_ROOM_NAME,
            RoomSettings {
                empty_timeout: 300,
                max_participants: 10,
            },
        )
        .await?;
    tracing::info!(sid = %room.sid, name = %room.name, "room created");

    let token = service.generate_join_token(
        TEST_ROOM_NAME,
        TEST_PARTICIPANT_IDENTITY,
        TEST_PARTICIPANT_NAME,
    )?;
    tracing::info!(identity = TEST_PARTICIPANT_IDENTITY, "generated participant token");

    let rooms = service.list_rooms().await?;
    tracing::info!(total = rooms.len(), "active rooms");
    for r in &rooms {
        tracing::info!(
            name = %r.name,
            sid = %r.sid,
            participants = r.num_participants,
            "room"
        );
    }

    let rule = "=".repeat(80);
    tracing::info!("{rule}");
    tracing::info!("TEST INSTRUCTIONS:");
    for step in test_instructions(&token) {
        tracing::info!("{step}");
    }
    tracing::info!("{rule}");

    tracing::info!("Room will remain active for testing. Press Ctrl+C to exit.");
    tokio::select! {
        () = tokio::time::sleep(KEEP_ALIVE) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let service = match LiveKitConfig::from_env().and_then(|config| {
        config.require_url()?;
        Ok(VoiceService::new(config))
    }) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e, "missing LiveKit credentials");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&service).await {
        tracing::error!(error = %e, "error during test");
        std::process::exit(1);
    }
}
