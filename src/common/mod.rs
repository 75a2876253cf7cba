//! Shared resilience components for the exchange client
//!
//! - Circuit breaker for fault isolation
//! - Sliding-window rate limiter
//! - Retry with bounded exponential backoff

pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use retry::RetryPolicy;
