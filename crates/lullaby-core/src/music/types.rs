//! Core types for music generation jobs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::GenerationError;
use super::providers::ProviderId;

/// Musical characteristics used to enrich prompts and tags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicParameters {
    pub bpm: Option<u32>,
    pub key: Option<String>,
    #[serde(default)]
    pub instruments: Vec<String>,
    pub dynamics: Option<String>,
    pub vocal_style: Option<String>,
}

impl MusicParameters {
    /// Comma-separated tag fragments, skipping anything unset
    pub fn tag_fragments(&self) -> Vec<String> {
        let mut parts = Vec::new();
        if let Some(bpm) = self.bpm {
            parts.push(format!("{} BPM", bpm));
        }
        if let Some(key) = &self.key {
            parts.push(key.clone());
        }
        if !self.instruments.is_empty() {
            parts.push(self.instruments.join(", "));
        }
        if let Some(dynamics) = &self.dynamics {
            parts.push(dynamics.clone());
        }
        if let Some(vocal) = &self.vocal_style {
            parts.push(vocal.clone());
        }
        parts
    }

    /// Sentence form for providers that take a free-text description
    pub fn describe(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(bpm) = self.bpm {
            parts.push(format!("{} BPM", bpm));
        }
        if let Some(key) = &self.key {
            parts.push(key.clone());
        }
        if !self.instruments.is_empty() {
            parts.push(format!("instruments: {}", self.instruments.join(", ")));
        }
        if let Some(dynamics) = &self.dynamics {
            parts.push(format!("{} dynamics", dynamics));
        }
        if let Some(vocal) = &self.vocal_style {
            parts.push(format!("{} vocals", vocal));
        }
        if parts.is_empty() {
            None
        } else {
            Some(format!("Musical characteristics: {}", parts.join(", ")))
        }
    }
}

/// A normalized text-to-music request, immutable once submitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub title: Option<String>,
    /// Style or tags, e.g. "lullaby, soft piano"
    pub style: Option<String>,
    /// Custom lyrics; providers generate their own when absent
    pub lyrics: Option<String>,
    pub instrumental: bool,
    pub custom_mode: bool,
    pub music_parameters: Option<MusicParameters>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            custom_mode: true,
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_lyrics(mut self, lyrics: impl Into<String>) -> Self {
        self.lyrics = Some(lyrics.into());
        self
    }

    pub fn with_instrumental(mut self, instrumental: bool) -> Self {
        self.instrumental = instrumental;
        self
    }

    pub fn with_custom_mode(mut self, custom_mode: bool) -> Self {
        self.custom_mode = custom_mode;
        self
    }

    pub fn with_music_parameters(mut self, params: MusicParameters) -> Self {
        self.music_parameters = Some(params);
        self
    }

    /// Reject requests that no provider would accept
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.prompt.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "prompt must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Non-empty custom lyrics, if any
    pub fn custom_lyrics(&self) -> Option<&str> {
        self.lyrics.as_deref().filter(|l| !l.trim().is_empty())
    }
}

/// A job accepted by a provider, identified by its opaque task id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderJob {
    pub provider: ProviderId,
    pub external_task_id: String,
    pub submitted_at: DateTime<Utc>,
}

impl ProviderJob {
    pub fn new(provider: ProviderId, external_task_id: impl Into<String>) -> Self {
        Self {
            provider,
            external_task_id: external_task_id.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// Why a job ended without a song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The provider itself flagged the job as failed
    ProviderReported(String),
    /// The poll budget ran out while the job was still in flight
    Timeout,
    /// The provider stayed unreachable past the retry allowance
    ProviderUnavailable(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::ProviderReported(msg) => write!(f, "provider reported failure: {}", msg),
            FailureReason::Timeout => write!(f, "timed out waiting for the provider"),
            FailureReason::ProviderUnavailable(msg) => write!(f, "provider unavailable: {}", msg),
        }
    }
}

/// Lifecycle state of a job, recomputed from every status payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed(FailureReason),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed(_) => 2,
        }
    }

    /// Combine the current state with a freshly observed one.
    ///
    /// Transitions only move forward: a terminal state is kept as is and a
    /// job that reached Processing never drops back to Pending.
    pub fn advance(self, observed: JobStatus) -> JobStatus {
        if self.is_terminal() || observed.rank() < self.rank() {
            self
        } else {
            observed
        }
    }
}

/// Canonical song result; every field may still be finalizing at the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSong {
    pub audio_url: Option<String>,
    pub title: Option<String>,
    pub duration_seconds: Option<f64>,
    pub lyrics: Option<String>,
    pub image_url: Option<String>,
    pub tags: Option<String>,
}

impl NormalizedSong {
    pub fn has_audio(&self) -> bool {
        self.audio_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// A status response body exactly as the provider returned it
#[derive(Debug, Clone, PartialEq)]
pub struct RawStatusPayload {
    pub provider: ProviderId,
    pub body: Value,
}

impl RawStatusPayload {
    pub fn new(provider: ProviderId, body: Value) -> Self {
        Self { provider, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_prompt_is_invalid() {
        let err = GenerationRequest::new("   ").validate().unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRequest(_)));
        assert!(GenerationRequest::new("a song about stars").validate().is_ok());
    }

    #[test]
    fn test_blank_lyrics_are_ignored() {
        let req = GenerationRequest::new("x").with_lyrics("  ");
        assert_eq!(req.custom_lyrics(), None);
        let req = GenerationRequest::new("x").with_lyrics("la la");
        assert_eq!(req.custom_lyrics(), Some("la la"));
    }

    #[test]
    fn test_advance_is_monotonic() {
        let status = JobStatus::Pending
            .advance(JobStatus::Processing)
            .advance(JobStatus::Pending);
        assert_eq!(status, JobStatus::Processing);

        let done = status.advance(JobStatus::Completed);
        assert_eq!(done.clone().advance(JobStatus::Processing), JobStatus::Completed);
        assert_eq!(done.advance(JobStatus::Pending), JobStatus::Completed);

        let failed = JobStatus::Processing.advance(JobStatus::Failed(FailureReason::Timeout));
        assert_eq!(
            failed.advance(JobStatus::Completed),
            JobStatus::Failed(FailureReason::Timeout)
        );
    }

    #[test]
    fn test_pending_can_jump_straight_to_terminal() {
        assert_eq!(JobStatus::Pending.advance(JobStatus::Completed), JobStatus::Completed);
    }

    #[test]
    fn test_music_parameters_text() {
        let params = MusicParameters {
            bpm: Some(60),
            key: Some("C major".into()),
            instruments: vec!["piano".into(), "harp".into()],
            dynamics: Some("soft".into()),
            vocal_style: None,
        };
        assert_eq!(
            params.tag_fragments(),
            vec!["60 BPM", "C major", "piano, harp", "soft"]
        );
        assert_eq!(
            params.describe().as_deref(),
            Some("Musical characteristics: 60 BPM, C major, instruments: piano, harp, soft dynamics")
        );
        assert_eq!(MusicParameters::default().describe(), None);
    }

    #[test]
    fn test_song_serializes_camel_case() {
        let song = NormalizedSong {
            audio_url: Some("https://cdn/a.mp3".into()),
            duration_seconds: Some(61.5),
            ..Default::default()
        };
        let json = serde_json::to_value(&song).unwrap();
        assert_eq!(json["audioUrl"], "https://cdn/a.mp3");
        assert_eq!(json["durationSeconds"], 61.5);
    }
}
