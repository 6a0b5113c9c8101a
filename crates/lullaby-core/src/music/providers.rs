//! Music provider registry
//!
//! Defines provider identifiers, authentication styles and the built-in
//! defaults for each supported text-to-music API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::providers as defaults;

/// Unique identifier for each supported provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// sunoapi.org generate/record-info API
    #[default]
    SunoApi,
    /// PiAPI unified task API with the Udio `music-u` model
    PiapiUdio,
    /// PiAPI Suno music endpoint, polled through the unified task API
    PiapiSuno,
    /// Offline provider that completes instantly with sample audio
    Demo,
}

impl ProviderId {
    /// Get all available provider IDs
    pub fn all() -> &'static [ProviderId] {
        &[
            ProviderId::SunoApi,
            ProviderId::PiapiUdio,
            ProviderId::PiapiSuno,
            ProviderId::Demo,
        ]
    }

    /// Get the storage key for this provider (used in config.toml)
    pub fn storage_key(&self) -> &'static str {
        match self {
            ProviderId::SunoApi => "suno_api",
            ProviderId::PiapiUdio => "piapi_udio",
            ProviderId::PiapiSuno => "piapi_suno",
            ProviderId::Demo => "demo",
        }
    }

    /// How this provider expects the API key
    pub fn auth_header(&self) -> AuthHeader {
        match self {
            ProviderId::SunoApi => AuthHeader::Bearer,
            ProviderId::PiapiUdio | ProviderId::PiapiSuno | ProviderId::Demo => AuthHeader::XApiKey,
        }
    }

    /// Default API base URL (without trailing slash)
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderId::SunoApi => defaults::SUNO_API_BASE_URL,
            ProviderId::PiapiUdio | ProviderId::PiapiSuno => defaults::PIAPI_BASE_URL,
            ProviderId::Demo => "demo://local",
        }
    }

    /// Default model sent with submissions
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderId::SunoApi => defaults::SUNO_API_MODEL,
            ProviderId::PiapiUdio => defaults::PIAPI_UDIO_MODEL,
            ProviderId::PiapiSuno => defaults::PIAPI_SUNO_MODEL,
            ProviderId::Demo => "demo",
        }
    }

    /// Environment variable holding the API key
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderId::SunoApi => Some("SUNO_API_KEY"),
            ProviderId::PiapiUdio | ProviderId::PiapiSuno => Some("PIAPI_API_KEY"),
            ProviderId::Demo => None,
        }
    }

    /// Whether this provider talks to a real network endpoint
    pub fn requires_credentials(&self) -> bool {
        !matches!(self, ProviderId::Demo)
    }

    /// Pricing hint to show in the CLI
    pub fn pricing_hint(&self) -> &'static str {
        match self {
            ProviderId::SunoApi => "$0.02-0.05 per song (varies by model)",
            ProviderId::PiapiUdio => "$0.05 per song",
            ProviderId::PiapiSuno => "$0.02 per song",
            ProviderId::Demo => "free",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderId::SunoApi => write!(f, "SunoAPI.org"),
            ProviderId::PiapiUdio => write!(f, "PiAPI Udio"),
            ProviderId::PiapiSuno => write!(f, "PiAPI Suno"),
            ProviderId::Demo => write!(f, "Demo"),
        }
    }
}

impl FromStr for ProviderId {
    type Err = String;

    /// Accepts storage keys plus the engine names used by `MUSIC_ENGINE`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "suno_api" | "sunoapi" | "suno" => Ok(ProviderId::SunoApi),
            "piapi_udio" | "udio" => Ok(ProviderId::PiapiUdio),
            "piapi_suno" => Ok(ProviderId::PiapiSuno),
            "demo" => Ok(ProviderId::Demo),
            other => Err(format!("unknown provider: {}", other)),
        }
    }
}

/// How to send the API key in requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AuthHeader {
    /// Use `x-api-key: <key>` header (PiAPI style)
    #[default]
    XApiKey,
    /// Use `Authorization: Bearer <key>` header (sunoapi.org style)
    Bearer,
}
