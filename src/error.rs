//! Error taxonomy for the trading agent
//!
//! Every error carries a transient/permanent classification that drives
//! the retry policy: transient failures (network, 5xx, 429) are retried,
//! permanent failures (auth, validation, exchange rejections) propagate
//! on the first attempt.

use thiserror::Error;

/// Errors surfaced by the exchange client and strategy engine
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed signing key material (bad base64, empty seed)
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// Bad credentials or rejected signature (401/403) - fatal, no retry
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Bad symbol, non-positive amount, or other local validation failure
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested notional exceeds current buying power; checked locally
    /// before any network call
    #[error("insufficient funds: requested ${requested}, available ${available}")]
    InsufficientFunds {
        requested: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    /// Exchange-side business rejection of an order - not retried
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// Connection failure or timeout before a response was received
    #[error("network error: {0}")]
    Network(String),

    /// 5xx response from the exchange
    #[error("server error ({status}): {body}")]
    Server { status: u16, body: String },

    /// 429 response; feeds back into rate limiter pacing
    #[error("rate limited by server")]
    RateLimited,

    /// Unparseable response body
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Circuit breaker rejected the call without touching the transport
    #[error("circuit breaker is open")]
    CircuitOpen,

    /// Retry budget exhausted; wraps the last transient error
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<ApiError>,
    },
}

impl ApiError {
    /// Whether the retry policy may attempt this call again
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::Server { .. } | ApiError::RateLimited
        )
    }

    /// Whether this failure counts against backend health. Permanent
    /// responses (4xx) prove the backend answered, so only transport-level
    /// failures open the circuit.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::Server { .. } | ApiError::RetryExhausted { .. }
        )
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
