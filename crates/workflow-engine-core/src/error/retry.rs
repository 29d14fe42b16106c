//! # Retry With Exponential Back-off
//!
//! One retry policy, used everywhere a call site talks to the database
//! or an external model/IM API (per the single-policy decision recorded
//! in DESIGN.md). Only [`WorkflowError::is_retryable`] errors are
//! retried; everything else returns immediately.

use super::WorkflowError;
use std::future::Future;
use std::time::Duration;

/// Marker trait for values that can decide whether they're worth retrying.
/// Implemented for [`WorkflowError`] directly; exists so call sites can
/// retry other error types that know how to map onto the same policy.
pub trait RetryableError {
    fn should_retry(&self) -> bool;
}

impl RetryableError for WorkflowError {
    fn should_retry(&self) -> bool {
        self.is_retryable()
    }
}

/// Exponential back-off with jitter-free doubling, capped at `max_delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts, ..Default::default() }
    }

    /// Delay before the given attempt (0-indexed: attempt 0 is the first retry).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }
}

/// Builder for [`RetryPolicy`], matching the fluent style the rest of
/// the error module uses for its configuration types.
pub struct RetryBuilder {
    policy: RetryPolicy,
}

impl Default for RetryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryBuilder {
    pub fn new() -> Self {
        Self { policy: RetryPolicy::default() }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_attempts = attempts;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.policy.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.policy.max_delay = delay;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.policy.multiplier = multiplier;
        self
    }

    pub fn build(self) -> RetryPolicy {
        self.policy
    }
}

/// Run `operation` under `policy`, retrying with back-off while the
/// returned error is retryable and the attempt budget remains. The
/// final (non-retryable, or budget-exhausted) error is returned as-is.
pub async fn retry_with_policy<F, Fut, T>(policy: &RetryPolicy, operation: F) -> Result<T, WorkflowError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, WorkflowError>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.should_retry() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
