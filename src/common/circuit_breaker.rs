//! Circuit breaker for fault isolation
//!
//! Tracks consecutive failures against the exchange backend and stops
//! calling it for a cooldown period once it is judged unhealthy.
//!
//! States:
//! - Closed: normal operation, calls pass through
//! - Open: backend unhealthy, calls are rejected immediately
//! - HalfOpen: cooldown elapsed, exactly one trial call is permitted

use std::time::Duration;
use tokio::time::Instant;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CircuitState {
    /// Normal operation
    #[default]
    Closed,
    /// Failing fast without touching the transport
    Open,
    /// One trial call in flight to probe recovery
    HalfOpen,
}

/// Configuration for the circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// Time the circuit stays open before permitting a trial call
    pub timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Consecutive-failure circuit breaker with a single-probe HalfOpen state.
///
/// The caller asks `can_attempt()` before each logical call and reports
/// the outcome through `record_success()` / `record_failure()`.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: CircuitState,
    consecutive_failures: u32,
    config: CircuitBreakerConfig,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            config,
            opened_at: None,
            probe_in_flight: false,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Whether the next call may proceed.
    ///
    /// In `Open`, transitions to `HalfOpen` once the timeout has elapsed
    /// and admits exactly one probe; further attempts are rejected until
    /// that probe's outcome is recorded.
    pub fn can_attempt(&mut self) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let timed_out = self
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.timeout)
                    .unwrap_or(true);
                if timed_out {
                    tracing::info!("circuit breaker half-open, admitting trial call");
                    self.state = CircuitState::HalfOpen;
                    self.probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if self.probe_in_flight {
                    false
                } else {
                    self.probe_in_flight = true;
                    true
                }
            }
        }
    }

    /// Record a successful call. Resets the failure count; a successful
    /// trial call closes the circuit.
    pub fn record_success(&mut self) {
        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                tracing::info!("circuit breaker closed after successful trial call");
                self.state = CircuitState::Closed;
                self.consecutive_failures = 0;
                self.probe_in_flight = false;
                self.opened_at = None;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call. Opens the circuit at the failure threshold;
    /// a failed trial call reopens it and restarts the cooldown timer.
    pub fn record_failure(&mut self) {
        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.config.failure_threshold {
                    tracing::warn!(
                        failures = self.consecutive_failures,
                        "circuit breaker opened"
                    );
                    self.state = CircuitState::Open;
                    self.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                tracing::warn!("circuit breaker re-opened after failed trial call");
                self.state = CircuitState::Open;
                self.opened_at = Some(Instant::now());
                self.probe_in_flight = false;
            }
            CircuitState::Open => {}
        }
    }

    /// Reset to the initial closed state
    pub fn reset(&mut self) {
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
        self.probe_in_flight = false;
    }

    pub fn is_open(&self) -> bool {
        self.state == CircuitState::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, timeout: Duration) -> CircuitBreaker {
        CircuitBreaker::new(
            CircuitBreakerConfig::default()
                .with_failure_threshold(threshold)
                .with_timeout(timeout),
        )
    }

    #[test]
    fn test_starts_closed_and_allows_attempts() {
        let mut cb = CircuitBreaker::with_defaults();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.can_attempt());
    }

    #[test]
    fn test_opens_at_failure_threshold() {
        let mut cb = breaker(3, Duration::from_secs(60));

        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.consecutive_failures(), 2);

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.can_attempt());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let mut cb = breaker(3, Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        assert_eq!(cb.consecutive_failures(), 0);

        // Needs a fresh run of three failures to open
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_exactly_one_probe() {
        let mut cb = breaker(1, Duration::from_secs(30));
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.can_attempt());

        tokio::time::advance(Duration::from_secs(31)).await;

        assert!(cb.can_attempt());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        // Second attempt while the probe is unresolved is rejected
        assert!(!cb.can_attempt());
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_probe_closes_circuit() {
        let mut cb = breaker(1, Duration::from_secs(30));
        cb.record_failure();
        tokio::time::advance(Duration::from_secs(31)).await;

        assert!(cb.can_attempt());
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.can_attempt());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_reopens_and_restarts_timer() {
        let mut cb = breaker(1, Duration::from_secs(30));
        cb.record_failure();
        tokio::time::advance(Duration::from_secs(31)).await;

        assert!(cb.can_attempt());
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        // Timer restarted: still open before another full timeout
        tokio::time::advance(Duration::from_secs(15)).await;
        assert!(!cb.can_attempt());

        tokio::time::advance(Duration::from_secs(16)).await;
        assert!(cb.can_attempt());
    }

    #[test]
    fn test_reset() {
        let mut cb = breaker(1, Duration::from_secs(60));
        cb.record_failure();
        assert!(cb.is_open());

        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.can_attempt());
    }
}
