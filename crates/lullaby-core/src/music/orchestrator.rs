//! Submit-then-poll entry point
//!
//! [`GenerationOrchestrator`] hides the provider choice and the polling loop
//! behind a single `generate` call that yields either a finished song or a
//! typed [`GenerationFailure`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::adapter::ProviderAdapter;
use super::error::{FailureKind, GenerationFailure};
use super::poller::{JobStatusPoller, PollBudget, PollOutcome};
use super::providers::ProviderId;
use super::types::{GenerationRequest, JobStatus, NormalizedSong, ProviderJob};

/// Orchestrates one provider adapter. Cheap to share across tasks.
#[derive(Clone)]
pub struct GenerationOrchestrator {
    adapter: Arc<dyn ProviderAdapter>,
    poller: JobStatusPoller,
}

impl GenerationOrchestrator {
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            adapter,
            poller: JobStatusPoller::default(),
        }
    }

    pub fn with_budget(mut self, budget: PollBudget) -> Self {
        self.poller = JobStatusPoller::new(budget);
        self
    }

    pub fn provider_id(&self) -> ProviderId {
        self.adapter.provider_id()
    }

    /// Generate a song, waiting for the provider to finish
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<NormalizedSong, GenerationFailure> {
        self.generate_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Like [`generate`](Self::generate), abandoning the wait when `cancel`
    /// fires. The provider-side job keeps running.
    pub async fn generate_with_cancel(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<NormalizedSong, GenerationFailure> {
        let job = self.submit(request).await?;
        self.wait(&job, &cancel).await
    }

    /// Submit without waiting
    pub async fn submit(
        &self,
        request: &GenerationRequest,
    ) -> Result<ProviderJob, GenerationFailure> {
        let provider = self.adapter.provider_id();
        let job = self.adapter.submit(request).await.map_err(|e| {
            warn!(%provider, "Submission failed: {}", e);
            GenerationFailure::from(e)
        })?;
        info!(%provider, task_id = %job.external_task_id, "Job submitted");
        Ok(job)
    }

    /// Poll an already submitted job to completion
    pub async fn wait(
        &self,
        job: &ProviderJob,
        cancel: &CancellationToken,
    ) -> Result<NormalizedSong, GenerationFailure> {
        let outcome = self.poller.poll(job, self.adapter.as_ref(), cancel).await?;
        into_song(job, outcome)
    }
}

/// A terminal outcome becomes either a playable song or a failure
fn into_song(job: &ProviderJob, outcome: PollOutcome) -> Result<NormalizedSong, GenerationFailure> {
    match outcome.status {
        JobStatus::Completed => match outcome.song {
            Some(song) if song.has_audio() => {
                info!(
                    task_id = %job.external_task_id,
                    attempts = outcome.attempts,
                    "Song ready"
                );
                Ok(song)
            }
            _ => {
                warn!(task_id = %job.external_task_id, "Job completed without an audio URL");
                Err(GenerationFailure::new(
                    FailureKind::ProviderReported,
                    "completed without audio",
                ))
            }
        },
        JobStatus::Failed(reason) => {
            warn!(task_id = %job.external_task_id, "Job failed: {}", reason);
            Err(reason.into())
        }
        // The poller only returns terminal states
        JobStatus::Pending | JobStatus::Processing => Err(GenerationFailure::new(
            FailureKind::Timeout,
            "job did not finish within the polling budget",
        )),
    }
}
