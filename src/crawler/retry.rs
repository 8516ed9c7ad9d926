//! Bounded retry with randomized exponential backoff
//!
//! Only `Transient` failures are retried. Every other category propagates on
//! the attempt that produced it.

use crate::config::RetryConfig;
use crate::crawler::classifier::RequestFailure;
use std::future::Future;
use std::time::Duration;

/// Retry budget and backoff bounds
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
    /// Statuses the classifier treats as transient
    pub transient_codes: Vec<u16>,
}

impl RetryPolicy {
    /// Computes the wait before the attempt following `attempt`
    ///
    /// The ceiling doubles with each attempt from `min_wait` and is capped at
    /// `max_wait`; the actual wait is drawn uniformly between `min_wait` and
    /// the ceiling.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let min_ms = self.min_wait.as_millis() as u64;
        let max_ms = self.max_wait.as_millis() as u64;

        let shift = attempt.saturating_sub(1).min(32);
        let ceiling = min_ms.saturating_mul(1u64 << shift).min(max_ms);

        if ceiling <= min_ms {
            return Duration::from_millis(min_ms);
        }

        Duration::from_millis(fastrand::u64(min_ms..=ceiling))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            min_wait: Duration::from_millis(config.min_wait_ms),
            max_wait: Duration::from_millis(config.max_wait_ms),
            transient_codes: config.transient_status_codes.clone(),
        }
    }
}

/// Wraps a single-attempt operation with the retry policy
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `operation` until it succeeds, fails with a non-transient
    /// category, or the attempt budget is spent
    ///
    /// `operation` must perform exactly one network attempt per call and
    /// return an already-classified failure. On exhaustion the last failure
    /// is returned, with `attempts` set to the number of calls made.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, RequestFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RequestFailure>>,
    {
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(mut failure) => {
                    failure.attempts = attempt;

                    if !failure.category.is_retryable() {
                        tracing::debug!(
                            category = %failure.category,
                            "Failing fast without retry: {}",
                            failure.message
                        );
                        return Err(failure);
                    }

                    if attempt >= self.policy.max_attempts {
                        tracing::warn!(
                            attempts = attempt,
                            "Retry budget exhausted: {}",
                            failure.message
                        );
                        return Err(failure);
                    }

                    let wait = self.policy.backoff(attempt);
                    tracing::warn!(
                        attempt = attempt,
                        max_attempts = self.policy.max_attempts,
                        category = %failure.category,
                        wait_ms = wait.as_millis() as u64,
                        "Retrying after transient failure: {}",
                        failure.message
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}
