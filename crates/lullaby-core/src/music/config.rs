//! Generator configuration
//!
//! Settings are read from `config.toml` in the platform config directory and
//! then overridden by environment variables. Nothing here is global: the
//! resolved [`ProviderSettings`] are passed explicitly into adapter
//! construction.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::GenerationError;
use super::poller::PollBudget;
use super::providers::{AuthHeader, ProviderId};
use crate::constants;

/// Credentials and endpoint overrides for one provider family
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub callback_url: Option<String>,
}

/// Polling knobs, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingSection {
    pub max_attempts: u32,
    pub interval_secs: u64,
    pub max_total_secs: u64,
    pub max_unavailable_retries: u32,
    /// Double the interval after every attempt instead of waiting a fixed time
    pub exponential: bool,
    /// Add up to a second of random delay to every wait
    pub jitter: bool,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            max_attempts: constants::polling::MAX_ATTEMPTS,
            interval_secs: constants::polling::INTERVAL.as_secs(),
            max_total_secs: constants::polling::MAX_TOTAL.as_secs(),
            max_unavailable_retries: constants::polling::MAX_UNAVAILABLE_RETRIES,
            exponential: false,
            jitter: false,
        }
    }
}

/// Top-level settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Which provider to submit jobs to
    pub provider: ProviderId,
    /// Route everything to the offline demo provider
    pub demo_mode: bool,
    /// sunoapi.org settings
    pub suno_api: ProviderSection,
    /// PiAPI settings (shared by the Udio and Suno models)
    pub piapi: ProviderSection,
    pub polling: PollingSection,
}

impl Settings {
    /// Get the default settings file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(constants::config::CONFIG_DIR_NAME)
                .join(constants::config::CONFIG_FILE_NAME)
        })
    }

    /// Load settings from the default path, then apply the process environment
    pub fn load() -> Result<Self> {
        let mut settings = match Self::path() {
            Some(path) => Self::load_from_path(&path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Load settings from a specific path; a missing file yields defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        tracing::debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Override values from environment-style lookups.
    ///
    /// Recognized keys: `MUSIC_ENGINE`, `DEMO_MODE`, `SUNO_API_KEY`,
    /// `SUNO_BASE_URL`, `SUNO_MODEL`, `SUNO_CALLBACK_URL`, `PIAPI_API_KEY`,
    /// `PIAPI_BASE_URL`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(engine) = get("MUSIC_ENGINE") {
            match engine.parse::<ProviderId>() {
                Ok(id) => self.provider = id,
                Err(e) => tracing::warn!("Ignoring MUSIC_ENGINE: {}", e),
            }
        }
        if let Some(demo) = get("DEMO_MODE") {
            self.demo_mode = demo.eq_ignore_ascii_case("true") || demo == "1";
        }

        if let Some(v) = get("SUNO_API_KEY") {
            self.suno_api.api_key = Some(v);
        }
        if let Some(v) = get("SUNO_BASE_URL") {
            self.suno_api.base_url = Some(v);
        }
        if let Some(v) = get("SUNO_MODEL") {
            self.suno_api.model = Some(v);
        }
        if let Some(v) = get("SUNO_CALLBACK_URL") {
            self.suno_api.callback_url = Some(v);
        }
        if let Some(v) = get("PIAPI_API_KEY") {
            self.piapi.api_key = Some(v);
        }
        if let Some(v) = get("PIAPI_BASE_URL") {
            self.piapi.base_url = Some(v);
        }
    }

    /// The provider jobs will actually go to
    pub fn effective_provider(&self) -> ProviderId {
        if self.demo_mode {
            ProviderId::Demo
        } else {
            self.provider
        }
    }

    /// Resolve and validate the settings for the effective provider
    pub fn provider_settings(&self) -> Result<ProviderSettings, GenerationError> {
        self.settings_for(self.effective_provider())
    }

    /// Resolve and validate the settings for a specific provider
    pub fn settings_for(&self, provider: ProviderId) -> Result<ProviderSettings, GenerationError> {
        let section = match provider {
            ProviderId::SunoApi => Some(&self.suno_api),
            ProviderId::PiapiUdio | ProviderId::PiapiSuno => Some(&self.piapi),
            ProviderId::Demo => None,
        };

        let mut resolved = ProviderSettings::new(provider, "");
        if let Some(section) = section {
            resolved.api_key = section.api_key.clone().unwrap_or_default();
            if let Some(url) = &section.base_url {
                resolved.base_url = url.clone();
            }
            if let Some(model) = &section.model {
                resolved.model = model.clone();
            }
            if let Some(callback) = &section.callback_url {
                resolved.callback_url = Some(callback.clone());
            }
        }

        resolved.validate()?;
        Ok(resolved)
    }

    /// Poll budget described by the `[polling]` section
    pub fn poll_budget(&self) -> PollBudget {
        let budget = PollBudget::new(
            self.polling.max_attempts,
            Duration::from_secs(self.polling.interval_secs),
            Duration::from_secs(self.polling.max_total_secs),
        )
        .with_max_unavailable_retries(self.polling.max_unavailable_retries);
        let budget = if self.polling.exponential {
            budget.with_exponential_backoff(constants::polling::MAX_DELAY)
        } else {
            budget
        };
        budget.with_jitter(self.polling.jitter)
    }
}

/// Fully resolved configuration for one adapter
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub provider: ProviderId,
    pub api_key: String,
    /// Base URL without trailing slash
    pub base_url: String,
    pub model: String,
    pub callback_url: Option<String>,
}

impl ProviderSettings {
    /// Settings with the provider's default endpoint and model; no callback
    pub fn new(provider: ProviderId, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
            callback_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn auth_header(&self) -> AuthHeader {
        self.provider.auth_header()
    }

    /// Base URL with any trailing slash removed
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Reject empty credentials or endpoints before any request is attempted
    pub fn validate(&self) -> Result<(), GenerationError> {
        if !self.provider.requires_credentials() {
            return Ok(());
        }
        if self.api_key.trim().is_empty() {
            let hint = self.provider.api_key_env().unwrap_or("api_key");
            return Err(GenerationError::Config(format!(
                "{} API key is not set ({})",
                self.provider, hint
            )));
        }
        if self.base_url.trim().is_empty() {
            return Err(GenerationError::Config(format!(
                "{} base URL is empty",
                self.provider
            )));
        }
        url::Url::parse(self.base()).map_err(|e| {
            GenerationError::Config(format!("{} base URL is invalid: {}", self.provider, e))
        })?;
        Ok(())
    }
}
