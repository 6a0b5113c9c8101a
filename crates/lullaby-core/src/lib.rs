//! Lullaby Core - Shared library for text-to-music generation
//!
//! This crate provides the core functionality for the Lullaby CLI:
//! - Provider adapters for Suno-compatible and PiAPI/Udio task APIs
//! - Normalization of heterogeneous status payloads into one song shape
//! - Budgeted polling with backoff, rate-limit handling and cancellation
//! - A single orchestrator entry point for submit-then-poll

pub mod constants;
pub mod music;

// Re-exports for convenience
pub use music::adapter::{build_adapter, ProviderAdapter};
pub use music::config::{ProviderSettings, Settings};
pub use music::error::{FailureKind, GenerationError, GenerationFailure};
pub use music::orchestrator::GenerationOrchestrator;
pub use music::poller::{JobStatusPoller, PollBudget, PollOutcome};
pub use music::providers::ProviderId;
pub use music::types::{
    FailureReason, GenerationRequest, JobStatus, NormalizedSong, ProviderJob, RawStatusPayload,
};
