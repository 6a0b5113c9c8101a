//! Provider adapters
//!
//! Each provider's request and response shapes sit behind one
//! [`ProviderAdapter`] trait. The concrete adapter is chosen from the
//! [`ProviderId`] tag in the resolved settings.

mod demo;
mod piapi;
mod suno_api;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::client::MusicHttp;
use super::config::ProviderSettings;
use super::error::GenerationError;
use super::providers::ProviderId;
use super::types::{GenerationRequest, ProviderJob, RawStatusPayload};

pub use demo::DemoAdapter;
pub use piapi::{PiapiSunoAdapter, PiapiUdioAdapter};
pub use suno_api::SunoApiAdapter;

/// Uniform contract over every text-to-music provider
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Which provider this adapter talks to
    fn provider_id(&self) -> ProviderId;

    /// Submit a generation job.
    ///
    /// Validates the request before any network call.
    async fn submit(&self, request: &GenerationRequest) -> Result<ProviderJob, GenerationError>;

    /// Fetch the raw status payload for a submitted job
    async fn fetch_status(&self, job: &ProviderJob) -> Result<RawStatusPayload, GenerationError>;
}

/// Build the adapter for the given settings.
///
/// Settings are validated first, so an empty key or URL fails here rather
/// than at the first request.
pub fn build_adapter(
    settings: &ProviderSettings,
    http: MusicHttp,
) -> Result<Arc<dyn ProviderAdapter>, GenerationError> {
    settings.validate()?;
    let adapter: Arc<dyn ProviderAdapter> = match settings.provider {
        ProviderId::SunoApi => Arc::new(SunoApiAdapter::new(settings.clone(), http)),
        ProviderId::PiapiUdio => Arc::new(PiapiUdioAdapter::new(settings.clone(), http)),
        ProviderId::PiapiSuno => Arc::new(PiapiSunoAdapter::new(settings.clone(), http)),
        ProviderId::Demo => Arc::new(DemoAdapter::new()),
    };
    tracing::info!(
        provider = %settings.provider,
        base_url = settings.base(),
        "Using music provider"
    );
    Ok(adapter)
}

/// First non-empty task id found at any of the given JSON pointers
pub(crate) fn task_id_at(body: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|p| match body.pointer(p)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Fail a submission whose success response carried no task id
pub(crate) fn require_task_id(
    provider: ProviderId,
    body: &Value,
    pointers: &[&str],
) -> Result<String, GenerationError> {
    task_id_at(body, pointers).ok_or_else(|| {
        tracing::error!(%provider, body = %body, "Submission response has no task id");
        GenerationError::ProviderUnavailable(format!(
            "{} accepted the request but returned no task id",
            provider
        ))
    })
}
