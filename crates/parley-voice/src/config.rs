use crate::error::VoiceError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const LIVEKIT_URL_VAR: &str = "LIVEKIT_URL";
pub const LIVEKIT_API_KEY_VAR: &str = "LIVEKIT_API_KEY";
pub const LIVEKIT_API_SECRET_VAR: &str = "LIVEKIT_API_SECRET";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const DEEPGRAM_API_KEY_VAR: &str = "DEEPGRAM_API_KEY";

fn default_token_ttl_seconds() -> u64 {
    3600
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LiveKitConfig {
    pub url: String,
    pub api_key: String,
    #[serde(skip_serializing)]
    pub api_secret: String,
    /// JWT token TTL in seconds for LiveKit join tokens. Default: 3600 (1 hour).
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

impl fmt::Debug for LiveKitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveKitConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish()
    }
}

impl LiveKitConfig {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            token_ttl_seconds: default_token_ttl_seconds(),
        }
    }

    /// Reads `LIVEKIT_URL`, `LIVEKIT_API_KEY` and `LIVEKIT_API_SECRET` from
    /// the process environment.
    pub fn from_env() -> Result<Self, VoiceError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    ///
    /// The API key and secret are required; blank values count as missing.
    /// The URL is optional here because token minting works offline; use
    /// [`LiveKitConfig::require_url`] where a server is needed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, VoiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let (Some(api_key), Some(api_secret)) =
            (read(LIVEKIT_API_KEY_VAR), read(LIVEKIT_API_SECRET_VAR))
        else {
            return Err(VoiceError::MissingCredentials(format!(
                "{LIVEKIT_API_KEY_VAR} and {LIVEKIT_API_SECRET_VAR} must be set"
            )));
        };

        Ok(Self::new(
            read(LIVEKIT_URL_VAR).unwrap_or_default(),
            api_key,
            api_secret,
        ))
    }

    /// Returns the server URL, or an error if none is configured.
    pub fn require_url(&self) -> Result<&str, VoiceError> {
        if self.url.is_empty() {
            return Err(VoiceError::MissingCredentials(format!(
                "{LIVEKIT_URL_VAR} must be set"
            )));
        }
        Ok(&self.url)
    }
}

/// API keys for the speech and language providers the agent calls.
#[derive(Clone, Default)]
pub struct ProviderKeys {
    pub openai_api_key: String,
    pub deepgram_api_key: String,
}

impl fmt::Debug for ProviderKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderKeys")
            .field("openai_api_key", &"[REDACTED]")
            .field("deepgram_api_key", &"[REDACTED]")
            .finish()
    }
}

impl ProviderKeys {
    pub fn from_env() -> Result<Self, VoiceError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, VoiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| VoiceError::MissingCredentials(format!("{name} must be set")))
        };

        Ok(Self {
            openai_api_key: require(OPENAI_API_KEY_VAR)?,
            deepgram_api_key: require(DEEPGRAM_API_KEY_VAR)?,
        })
    }
}
