//! Budgeted status polling
//!
//! Repeatedly fetches a job's status until it reaches a terminal state or
//! the budget runs out. Time is measured with `tokio::time`, so tests can
//! run the whole loop with paused time.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::adapter::ProviderAdapter;
use super::error::GenerationError;
use super::normalize::normalize;
use super::retry::{BackoffPolicy, IsRetryable};
use super::types::{FailureReason, JobStatus, NormalizedSong, ProviderJob};
use crate::constants;

/// Limits for one polling run
#[derive(Debug, Clone, PartialEq)]
pub struct PollBudget {
    /// Maximum number of status checks
    pub max_attempts: u32,
    /// Nominal delay between checks
    pub interval: Duration,
    /// Wall-clock ceiling for the whole run
    pub max_total: Duration,
    /// Consecutive `ProviderUnavailable` errors tolerated
    pub max_unavailable_retries: u32,
    pub backoff: BackoffPolicy,
}

impl Default for PollBudget {
    fn default() -> Self {
        Self::new(
            constants::polling::MAX_ATTEMPTS,
            constants::polling::INTERVAL,
            constants::polling::MAX_TOTAL,
        )
    }
}

impl PollBudget {
    /// Fixed-interval budget
    pub fn new(max_attempts: u32, interval: Duration, max_total: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            max_total,
            max_unavailable_retries: constants::polling::MAX_UNAVAILABLE_RETRIES,
            backoff: BackoffPolicy::fixed(interval),
        }
    }

    pub fn with_max_unavailable_retries(mut self, retries: u32) -> Self {
        self.max_unavailable_retries = retries;
        self
    }

    /// Double the delay after every check, starting from `interval`
    pub fn with_exponential_backoff(mut self, max_delay: Duration) -> Self {
        self.backoff = BackoffPolicy::exponential(self.interval, max_delay);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.backoff = self.backoff.with_jitter(jitter);
        self
    }
}

/// Final state of a polling run
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    /// Always terminal
    pub status: JobStatus,
    /// Present when `status` is `Completed`
    pub song: Option<NormalizedSong>,
    /// Status checks performed
    pub attempts: u32,
}

impl PollOutcome {
    fn failed(reason: FailureReason, attempts: u32) -> Self {
        Self {
            status: JobStatus::Failed(reason),
            song: None,
            attempts,
        }
    }
}

/// Drives one job to a terminal state
#[derive(Debug, Clone, Default)]
pub struct JobStatusPoller {
    budget: PollBudget,
}

impl JobStatusPoller {
    pub fn new(budget: PollBudget) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> &PollBudget {
        &self.budget
    }

    /// Poll until the job is terminal.
    ///
    /// Budget exhaustion and repeated unavailability come back as a failed
    /// [`PollOutcome`]; auth, payment, not-found and invalid-request errors
    /// are returned as `Err`. The provider job is never cancelled remotely.
    pub async fn poll(
        &self,
        job: &ProviderJob,
        adapter: &dyn ProviderAdapter,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, GenerationError> {
        let budget = &self.budget;
        let started = Instant::now();
        let mut status = JobStatus::Pending;
        let mut unavailable_streak = 0u32;
        let mut attempts = 0u32;

        for attempt in 0..budget.max_attempts {
            if cancel.is_cancelled() {
                info!(task_id = %job.external_task_id, "Polling cancelled");
                return Err(GenerationError::Cancelled);
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(task_id = %job.external_task_id, "Polling cancelled");
                    return Err(GenerationError::Cancelled);
                }
                fetched = adapter.fetch_status(job) => fetched,
            };
            attempts = attempt + 1;

            let delay = match fetched {
                Ok(raw) => {
                    unavailable_streak = 0;
                    let normalized = normalize(&raw);
                    status = status.advance(normalized.status);
                    debug!(
                        task_id = %job.external_task_id,
                        attempt = attempts,
                        status = ?status,
                        "Status check"
                    );
                    if status.is_terminal() {
                        info!(
                            task_id = %job.external_task_id,
                            attempts = attempts,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            status = ?status,
                            "Job reached terminal state"
                        );
                        return Ok(PollOutcome {
                            status,
                            song: normalized.song,
                            attempts,
                        });
                    }
                    budget.backoff.delay_for(attempt)
                }
                Err(e @ GenerationError::RateLimited { .. }) => {
                    let wait = budget.backoff.rate_limit_delay(attempt, e.retry_after());
                    warn!(
                        task_id = %job.external_task_id,
                        attempt = attempts,
                        delay_ms = wait.as_millis() as u64,
                        "Status check rate limited: {}",
                        e
                    );
                    wait
                }
                Err(GenerationError::ProviderUnavailable(msg)) => {
                    unavailable_streak += 1;
                    if unavailable_streak > budget.max_unavailable_retries {
                        warn!(
                            task_id = %job.external_task_id,
                            failures = unavailable_streak,
                            "Provider unavailable, giving up: {}",
                            msg
                        );
                        return Ok(PollOutcome::failed(
                            FailureReason::ProviderUnavailable(msg),
                            attempts,
                        ));
                    }
                    warn!(
                        task_id = %job.external_task_id,
                        failures = unavailable_streak,
                        max_retries = budget.max_unavailable_retries,
                        "Provider unavailable, retrying: {}",
                        msg
                    );
                    budget.backoff.delay_for(attempt)
                }
                Err(e) => return Err(e),
            };

            if attempt + 1 >= budget.max_attempts {
                break;
            }
            let delay = budget.backoff.jittered(delay);
            if started.elapsed() + delay > budget.max_total {
                debug!(task_id = %job.external_task_id, "Wall-clock budget exhausted");
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(task_id = %job.external_task_id, "Polling cancelled");
                    return Err(GenerationError::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        warn!(
            task_id = %job.external_task_id,
            max_attempts = budget.max_attempts,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Job did not finish within the polling budget"
        );
        Ok(PollOutcome::failed(FailureReason::Timeout, attempts))
    }
}
