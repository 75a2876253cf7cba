//! Retry with bounded exponential backoff
//!
//! Only transient failures are retried; permanent failures (auth,
//! validation, exchange rejections) propagate from the first attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

/// Configuration for retrying a single logical call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per subsequent attempt
    pub backoff_base: Duration,
    /// Upper bound on any single backoff delay
    pub backoff_max: Duration,
    /// Uniform random jitter added to each delay
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(8),
            jitter: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = Duration::ZERO;
        self
    }

    /// Backoff before attempt `n` (1-based): `min(base * 2^(n-2), max)`.
    /// The first attempt has no delay.
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exp = attempt - 2;
        let scaled = self
            .backoff_base
            .checked_mul(1u32.checked_shl(exp).unwrap_or(u32::MAX))
            .unwrap_or(self.backoff_max);
        scaled.min(self.backoff_max)
    }

    /// Run `op` until it succeeds, fails permanently, or the attempt
    /// budget is spent. Exhaustion wraps the last error in
    /// [`ApiError::RetryExhausted`].
    pub async fn execute<F, Fut, T>(&self, op: F) -> ApiResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut last_error: Option<ApiError> = None;

        for attempt in 1..=self.max_attempts {
            let delay = self.delay_before_attempt(attempt);
            if !delay.is_zero() {
                let jittered = delay + jitter_sample(self.jitter);
                tracing::debug!(
                    attempt,
                    delay_ms = jittered.as_millis() as u64,
                    "backing off before retry"
                );
                tokio::time::sleep(jittered).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "transient failure"
                    );
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(ApiError::RetryExhausted {
            attempts: self.max_attempts,
            source: Box::new(last_error.unwrap_or(ApiError::Network("no attempts made".into()))),
        })
    }
}

/// Uniform sample in `[0, max)`, without pulling in a rand dependency.
/// Sub-millisecond clock noise is plenty for backoff desynchronization.
fn jitter_sample(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    Duration::from_nanos(nanos % max.as_nanos() as u64)
}
