//! HTTP plumbing shared by all provider adapters

pub mod core;

pub use self::core::{classify_envelope, classify_status, http_codes, EnvelopeCodes, MusicHttp};
