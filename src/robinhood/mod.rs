//! Robinhood crypto trading API integration
//!
//! Request signing, wire types, and the resilient HTTP client.

pub mod auth;
pub mod client;
pub mod types;

pub use auth::Credentials;
pub use client::{notional_to_quantity, ClientConfig, RobinhoodClient, MAX_QUANTITY_DECIMALS};
pub use types::{
    Account, Holding, Order, OrderFilter, OrderRequest, OrderSide, OrderState, OrderType,
    PriceQuote, TradingPair,
};
