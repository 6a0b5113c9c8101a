//! Music generation layer
//!
//! Submits text-to-music jobs to external providers (sunoapi.org, PiAPI Udio,
//! PiAPI Suno), polls them to completion and normalizes the results.

// Provider plumbing
pub mod adapter;
pub mod client;
pub mod providers;
pub mod retry;

// Job lifecycle
pub mod normalize;
pub mod orchestrator;
pub mod poller;

// Shared infrastructure
pub mod config;
pub mod error;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;
