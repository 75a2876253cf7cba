//! Automated crypto trading agent for the Robinhood trading API
//!
//! The crate is organized in three layers:
//!
//! - [`robinhood`]: a resilient, signed HTTP client for the exchange
//!   (circuit breaker, retry with backoff, sliding-window rate limiting)
//! - [`storage`]: crash-safe JSON persistence for strategy configuration
//!   and runtime position state
//! - [`trading`]: strategy evaluation (stop-loss/take-profit and
//!   dollar-cost averaging) driven by a fixed-interval scheduler
//!
//! All monetary and quantity arithmetic uses [`rust_decimal::Decimal`];
//! floats never touch money.

pub mod common;
pub mod config;
pub mod error;
pub mod robinhood;
pub mod storage;
pub mod symbols;
pub mod trading;

pub use config::Settings;
pub use error::{ApiError, ApiResult};
pub use robinhood::RobinhoodClient;
pub use trading::{Scheduler, Strategy, StrategyEngine, StrategyParams};
