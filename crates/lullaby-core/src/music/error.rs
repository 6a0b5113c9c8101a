//! Error taxonomy for provider calls and generation results

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::retry::IsRetryable;
use super::types::FailureReason;

/// Errors raised by provider adapters and the poller
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    /// API key rejected (401/403)
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Too many requests (429)
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Account out of credits (402)
    #[error("payment required: {0}")]
    PaymentRequired(String),

    /// Provider rejected the request shape (400/422) or it failed local validation
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Task id unknown to the provider (404)
    #[error("task not found: {0}")]
    NotFound(String),

    /// Network failure, timeout, 5xx or an unreadable response
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Missing or empty configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller abandoned the poll loop
    #[error("cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Classify a transport-level reqwest failure
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            GenerationError::ProviderUnavailable(format!("request timed out: {}", err))
        } else if err.is_connect() {
            GenerationError::ProviderUnavailable(format!("connection failed: {}", err))
        } else if err.is_decode() {
            GenerationError::ProviderUnavailable(format!("unreadable response: {}", err))
        } else {
            GenerationError::ProviderUnavailable(err.to_string())
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            GenerationError::Auth(_) => FailureKind::Auth,
            GenerationError::RateLimited { .. } => FailureKind::RateLimited,
            GenerationError::PaymentRequired(_) => FailureKind::PaymentRequired,
            GenerationError::InvalidRequest(_) => FailureKind::InvalidRequest,
            GenerationError::NotFound(_) => FailureKind::NotFound,
            GenerationError::ProviderUnavailable(_) => FailureKind::ProviderUnavailable,
            GenerationError::Config(_) => FailureKind::Config,
            GenerationError::Cancelled => FailureKind::Cancelled,
        }
    }
}

impl IsRetryable for GenerationError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::RateLimited { .. } | GenerationError::ProviderUnavailable(_)
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            GenerationError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Category of a failed generation, stable enough to persist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Auth,
    RateLimited,
    PaymentRequired,
    InvalidRequest,
    NotFound,
    ProviderUnavailable,
    ProviderReported,
    Timeout,
    Cancelled,
    Config,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Auth => "authentication error",
            FailureKind::RateLimited => "rate limited",
            FailureKind::PaymentRequired => "payment required",
            FailureKind::InvalidRequest => "invalid request",
            FailureKind::NotFound => "not found",
            FailureKind::ProviderUnavailable => "provider unavailable",
            FailureKind::ProviderReported => "generation failed",
            FailureKind::Timeout => "timeout",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Config => "configuration error",
        };
        f.write_str(label)
    }
}

/// Typed failure returned by the orchestrator, with a human-readable reason
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct GenerationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl GenerationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<GenerationError> for GenerationFailure {
    fn from(err: GenerationError) -> Self {
        let message = match &err {
            GenerationError::Auth(m)
            | GenerationError::PaymentRequired(m)
            | GenerationError::InvalidRequest(m)
            | GenerationError::NotFound(m)
            | GenerationError::ProviderUnavailable(m)
            | GenerationError::Config(m) => m.clone(),
            GenerationError::RateLimited { message, .. } => message.clone(),
            GenerationError::Cancelled => "generation cancelled by caller".to_string(),
        };
        Self::new(err.kind(), message)
    }
}

impl From<FailureReason> for GenerationFailure {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::ProviderReported(msg) => Self::new(FailureKind::ProviderReported, msg),
            FailureReason::Timeout => Self::new(
                FailureKind::Timeout,
                "job did not finish within the polling budget",
            ),
            FailureReason::ProviderUnavailable(msg) => {
                Self::new(FailureKind::ProviderUnavailable, msg)
            }
        }
    }
}
