use crate::config::LiveKitConfig;
use crate::error::VoiceError;
use livekit_api::access_token::{AccessToken, VideoGrants};
use livekit_api::services::room::{CreateRoomOptions, RoomClient};
use livekit_protocol::Room;
use std::time::Duration;

/// Settings applied when creating a room through the Room Service API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomSettings {
    /// Seconds an empty room stays open before the server closes it.
    pub empty_timeout: u32,
    /// Maximum participants; 0 means no limit.
    pub max_participants: u32,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            empty_timeout: 300,
            max_participants: 0,
        }
    }
}

#[derive(Debug)]
pub struct VoiceService {
    config: LiveKitConfig,
    room_client: RoomClient,
}

impl VoiceService {
    pub fn new(config: LiveKitConfig) -> Self {
        let room_client = RoomClient::with_api_key(
            &http_url(&config.url),
            &config.api_key,
            &config.api_secret,
        );
        Self {
            config,
            room_client,
        }
    }

    pub fn generate_join_token(
        &self,
        room_name: &str,
        participant_identity: &str,
        participant_name: &str,
    ) -> Result<String, VoiceError> {
        let token = AccessToken::with_api_key(&self.config.api_key, &self.config.api_secret)
            .with_identity(participant_identity)
            .with_name(participant_name)
            .with_grants(VideoGrants {
                room_join: true,
                room: room_name.to_string(),
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
                ..Default::default()
            })
            .with_ttl(Duration::from_secs(self.config.token_ttl_seconds));

        token.to_jwt().map_err(VoiceError::LiveKit)
    }

    /// Creates a room. LiveKit returns the existing room if one with the
    /// same name is already open.
    pub async fn create_room(&self, name: &str, settings: RoomSettings) -> Result<Room, VoiceError> {
        let options = CreateRoomOptions {
            empty_timeout: settings.empty_timeout,
            max_participants: settings.max_participants,
            ..Default::default()
        };

        self.room_client
            .create_room(name, options)
            .await
            .map_err(|e| VoiceError::RoomService(e.to_string()))
    }

    /// Lists every active room on the server.
    pub async fn list_rooms(&self) -> Result<Vec<Room>, VoiceError> {
        self.room_client
            .list_rooms(Vec::new())
            .await
            .map_err(|e| VoiceError::RoomService(e.to_string()))
    }
}

/// Maps a client-facing `ws(s)://` URL to the `http(s)://` base the Room
/// Service API is served on. Other schemes pass through unchanged.
pub fn http_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = url.strip_prefix("ws://") {
        format!("http://{rest}")
    } else {
        url.to_string()
    }
}
