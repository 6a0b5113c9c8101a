//! Backoff policy with optional jitter
//!
//! Delays between status checks are computed by a pure function of the
//! attempt number so the poller can be tested without real waiting.
//! Also implements generic retry for one-shot transient failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::constants;

/// Minimum extra wait added on top of the nominal delay after a 429
const RATE_LIMIT_MIN_EXTRA: Duration = Duration::from_secs(1);

/// Delay schedule between attempts
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first attempt
    pub initial_delay: Duration,
    /// Growth factor per attempt (1.0 = fixed interval)
    pub multiplier: f64,
    /// Maximum nominal delay between attempts
    pub max_delay: Duration,
    /// Whether to add random jitter to delays
    pub jitter: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::fixed(constants::polling::INTERVAL)
    }
}

impl BackoffPolicy {
    /// Same delay after every attempt
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial_delay: interval,
            multiplier: 1.0,
            max_delay: interval,
            jitter: false,
        }
    }

    /// Doubling delays from `initial` up to `max`
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            initial_delay: initial,
            multiplier: 2.0,
            max_delay: max.max(initial),
            jitter: false,
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Nominal delay after the given zero-based attempt, without jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let secs = self.initial_delay.as_secs_f64() * factor;
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Delay after a rate-limited attempt.
    ///
    /// Always strictly longer than `delay_for(attempt)`; a longer server
    /// supplied Retry-After wins.
    pub fn rate_limit_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let nominal = self.delay_for(attempt);
        let penalized = nominal
            .saturating_mul(2)
            .max(nominal + RATE_LIMIT_MIN_EXTRA);
        match retry_after {
            Some(server) if server > penalized => server,
            _ => penalized,
        }
    }

    /// Apply jitter (if enabled) to a computed delay
    pub fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter {
            let jitter_ms = rand::thread_rng().gen_range(0..1000);
            delay + Duration::from_millis(jitter_ms)
        } else {
            delay
        }
    }
}

/// Configuration for one-shot retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Delay schedule
    pub backoff: BackoffPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffPolicy::exponential(
                Duration::from_millis(500),
                Duration::from_secs(8),
            )
            .with_jitter(true),
        }
    }
}

/// Trait for errors that may be retryable
pub trait IsRetryable {
    /// Check if this error is retryable
    fn is_retryable(&self) -> bool;

    /// Get the retry-after duration if specified by the server
    fn retry_after(&self) -> Option<Duration>;
}

/// Execute an async operation with retry logic
///
/// Respects Retry-After when the error carries one.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let wait = e
                    .retry_after()
                    .unwrap_or_else(|| config.backoff.delay_for(attempt));
                let jittered = config.backoff.jittered(wait);

                warn!(
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    delay_ms = jittered.as_millis() as u64,
                    "Retrying after error: {}",
                    e
                );

                tokio::time::sleep(jittered).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Parse Retry-After header value
///
/// The header can be either:
/// - A number of seconds (e.g., "120")
/// - An HTTP date (e.g., "Wed, 21 Oct 2015 07:28:00 GMT")
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();
    if let Ok(seconds) = header_value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(date) = httpdate::parse_http_date(header_value) {
        let now = std::time::SystemTime::now();
        if let Ok(duration) = date.duration_since(now) {
            return Some(duration);
        }
    }

    None
}
