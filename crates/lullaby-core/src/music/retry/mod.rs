//! Retry and backoff for provider calls

pub mod backoff;

pub use backoff::{parse_retry_after, with_retry, BackoffPolicy, IsRetryable, RetryConfig};
