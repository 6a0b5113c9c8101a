//! Offline demo provider
//!
//! Accepts any valid request and reports it finished on the first status
//! check with a public sample track. No network, no credentials.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::ProviderAdapter;
use crate::constants::providers::DEMO_AUDIO_URL;
use crate::music::error::GenerationError;
use crate::music::providers::ProviderId;
use crate::music::types::{GenerationRequest, ProviderJob, RawStatusPayload};

const DEMO_LYRICS: &str = "Demo song lyrics";
const DEMO_DURATION_SECS: u32 = 60;
const DEMO_TITLE: &str = "Demo Song";

#[derive(Debug, Clone, Default)]
pub struct DemoAdapter;

impl DemoAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProviderAdapter for DemoAdapter {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Demo
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<ProviderJob, GenerationError> {
        request.validate()?;
        let task_id = format!("demo-{}", uuid::Uuid::new_v4());
        info!(task_id = %task_id, "Demo generation accepted");
        Ok(ProviderJob::new(ProviderId::Demo, task_id))
    }

    async fn fetch_status(&self, job: &ProviderJob) -> Result<RawStatusPayload, GenerationError> {
        // Same shape as a finished PiAPI task
        let body = json!({
            "code": 200,
            "data": {
                "task_id": job.external_task_id,
                "status": "completed",
                "output": {
                    "songs": [{
                        "title": DEMO_TITLE,
                        "song_path": DEMO_AUDIO_URL,
                        "lyrics": DEMO_LYRICS,
                        "duration": DEMO_DURATION_SECS,
                        "tags": ["demo"],
                        "finished": true,
                    }],
                },
            },
        });
        Ok(RawStatusPayload::new(ProviderId::Demo, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::normalize::normalize;
    use crate::music::types::JobStatus;

    #[tokio::test]
    async fn test_demo_job_completes_immediately() {
        let adapter = DemoAdapter::new();
        let job = adapter.submit(&GenerationRequest::new("a calm song")).await.unwrap();
        assert!(job.external_task_id.starts_with("demo-"));

        let normalized = normalize(&adapter.fetch_status(&job).await.unwrap());
        assert_eq!(normalized.status, JobStatus::Completed);
        let song = normalized.song.unwrap();
        assert_eq!(song.audio_url.as_deref(), Some(DEMO_AUDIO_URL));
        assert_eq!(song.lyrics.as_deref(), Some("Demo song lyrics"));
        assert_eq!(song.duration_seconds, Some(60.0));
    }

    #[tokio::test]
    async fn test_demo_still_validates() {
        let err = DemoAdapter::new()
            .submit(&GenerationRequest::new(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_demo_task_ids_are_unique() {
        let adapter = DemoAdapter::new();
        let request = GenerationRequest::new("x");
        let a = adapter.submit(&request).await.unwrap();
        let b = adapter.submit(&request).await.unwrap();
        assert_ne!(a.external_task_id, b.external_task_id);
    }
}
