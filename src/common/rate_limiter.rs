//! Rate limiter for outbound API calls
//!
//! Sliding one-minute window: a call is admitted once fewer than
//! `requests_per_minute` calls have gone out in the trailing window.
//! Exhausted quota suspends the caller until the oldest call ages out;
//! requests are never dropped.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Configuration for the rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum requests allowed inside any sliding window
    pub requests_per_minute: usize,
    /// Window length; one minute in production, shorter in tests
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 100,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimiterConfig {
    pub fn with_requests_per_minute(mut self, limit: usize) -> Self {
        self.requests_per_minute = limit;
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Sliding-window rate limiter shared across clones.
///
/// ```no_run
/// use crypto_agent::common::RateLimiter;
///
/// #[tokio::main]
/// async fn main() {
///     let limiter = RateLimiter::with_limit(30);
///     limiter.acquire().await;
///     // issue request...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiter {
    sent_at: Arc<Mutex<VecDeque<Instant>>>,
    config: RateLimiterConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            sent_at: Arc::new(Mutex::new(VecDeque::new())),
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RateLimiterConfig::default())
    }

    pub fn with_limit(requests_per_minute: usize) -> Self {
        Self::new(RateLimiterConfig::default().with_requests_per_minute(requests_per_minute))
    }

    /// Wait until a slot is available inside the window, then claim it.
    pub async fn acquire(&self) {
        if self.config.requests_per_minute == 0 {
            return;
        }
        loop {
            let wake_at = {
                let mut sent = self.sent_at.lock().await;
                Self::prune(&mut sent, self.config.window);
                if sent.len() < self.config.requests_per_minute {
                    sent.push_back(Instant::now());
                    return;
                }
                // Oldest entry ages out of the window first
                *sent.front().expect("window is non-empty") + self.config.window
            };
            tracing::debug!("rate limit reached, waiting for window to roll");
            tokio::time::sleep_until(wake_at).await;
        }
    }

    /// Record a server-side throttle (HTTP 429) by burning an extra slot,
    /// so subsequent calls back off even though no request went out.
    pub async fn note_throttled(&self) {
        if self.config.requests_per_minute == 0 {
            return;
        }
        let mut sent = self.sent_at.lock().await;
        sent.push_back(Instant::now());
    }

    /// Calls currently counted inside the window
    pub async fn in_flight(&self) -> usize {
        let mut sent = self.sent_at.lock().await;
        Self::prune(&mut sent, self.config.window);
        sent.len()
    }

    fn prune(sent: &mut VecDeque<Instant>, window: Duration) {
        let now = Instant::now();
        while sent
            .front()
            .is_some_and(|&t| now.duration_since(t) >= window)
        {
            sent.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_admits_up_to_limit_immediately() {
        let limiter = RateLimiter::with_limit(3);
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(limiter.in_flight().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_excess_call_blocks_until_window_rolls() {
        let limiter = RateLimiter::new(
            RateLimiterConfig::default()
                .with_requests_per_minute(2)
                .with_window(Duration::from_secs(60)),
        );
        limiter.acquire().await;
        limiter.acquire().await;

        let blocked = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                limiter.acquire().await;
                Instant::now()
            })
        };

        let start = Instant::now();
        let released_at = blocked.await.unwrap();
        // The third call must have waited for the first slot to expire
        assert!(released_at.duration_since(start) >= Duration::from_secs(59));
        assert!(limiter.in_flight().await <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_count_never_exceeds_limit() {
        let limiter = RateLimiter::new(
            RateLimiterConfig::default()
                .with_requests_per_minute(5)
                .with_window(Duration::from_secs(60)),
        );
        for _ in 0..12 {
            limiter.acquire().await;
            assert!(limiter.in_flight().await <= 5);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_feedback_delays_next_call() {
        let limiter = RateLimiter::new(
            RateLimiterConfig::default()
                .with_requests_per_minute(2)
                .with_window(Duration::from_secs(60)),
        );
        limiter.acquire().await;
        limiter.note_throttled().await;
        assert_eq!(limiter.in_flight().await, 2);

        let start = Instant::now();
        limiter.acquire().await;
        assert!(Instant::now().duration_since(start) >= Duration::from_secs(59));
    }

    #[tokio::test]
    async fn test_zero_limit_is_unthrottled() {
        let limiter = RateLimiter::with_limit(0);
        limiter.acquire().await;
        limiter.acquire().await;
    }

    #[tokio::test]
    async fn test_clone_shares_window() {
        let a = RateLimiter::with_limit(10);
        let b = a.clone();
        a.acquire().await;
        b.acquire().await;
        assert_eq!(a.in_flight().await, 2);
    }
}
