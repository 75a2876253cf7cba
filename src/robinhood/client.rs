//! Robinhood crypto trading API client
//!
//! Every outbound call is layered circuit breaker -> retry policy ->
//! rate limiter -> signer -> transport, so an open circuit fails fast
//! before any retry delay or rate-limit wait is incurred.
//!
//! # Example
//!
//! ```no_run
//! use crypto_agent::robinhood::{ClientConfig, RobinhoodClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = RobinhoodClient::new(
//!         "api-key-id",
//!         "bW9jay1wcml2YXRlLWtleQ==",
//!         "https://trading.robinhood.com",
//!     )?;
//!     let account = client.authenticate().await?;
//!     println!("buying power: ${}", account.buying_power);
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::auth::Credentials;
use super::types::*;
use crate::common::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, RateLimiter, RateLimiterConfig,
    RetryPolicy,
};
use crate::error::{ApiError, ApiResult};
use crate::symbols;

pub const ACCOUNTS_ENDPOINT: &str = "/api/v1/crypto/trading/accounts/";
pub const HOLDINGS_ENDPOINT: &str = "/api/v1/crypto/trading/holdings/";
pub const ORDERS_ENDPOINT: &str = "/api/v1/crypto/trading/orders/";
pub const TRADING_PAIRS_ENDPOINT: &str = "/api/v1/crypto/trading/trading_pairs/";
pub const BEST_BID_ASK_ENDPOINT: &str = "/api/v1/crypto/marketdata/best_bid_ask/";

/// The exchange supports at most 8 decimal places of asset quantity;
/// anything finer is rejected server-side.
pub const MAX_QUANTITY_DECIMALS: u32 = 8;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request transport timeout
    pub timeout: Duration,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
    /// Outbound request pacing
    pub rate_limiter: RateLimiterConfig,
    /// Backend health tracking
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            rate_limiter: RateLimiterConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_requests_per_minute(mut self, limit: usize) -> Self {
        self.rate_limiter = self.rate_limiter.with_requests_per_minute(limit);
        self
    }

    pub fn with_circuit_breaker(mut self, cb: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = cb;
        self
    }
}

/// Authenticated client for the crypto trading API
#[derive(Clone)]
pub struct RobinhoodClient {
    credentials: Credentials,
    base_url: String,
    http: reqwest::Client,
    circuit_breaker: Arc<Mutex<CircuitBreaker>>,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
    // Monotonic per process even if the wall clock steps backwards
    last_timestamp: Arc<AtomicI64>,
}

impl RobinhoodClient {
    pub fn new(
        api_key: impl Into<String>,
        private_key_b64: &str,
        base_url: impl Into<String>,
    ) -> ApiResult<Self> {
        Self::with_config(api_key, private_key_b64, base_url, ClientConfig::default())
    }

    pub fn with_config(
        api_key: impl Into<String>,
        private_key_b64: &str,
        base_url: impl Into<String>,
        config: ClientConfig,
    ) -> ApiResult<Self> {
        let credentials = Credentials::new(api_key, private_key_b64)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            circuit_breaker: Arc::new(Mutex::new(CircuitBreaker::new(config.circuit_breaker))),
            rate_limiter: RateLimiter::new(config.rate_limiter),
            retry: config.retry,
            last_timestamp: Arc::new(AtomicI64::new(0)),
        })
    }

    /// Unix timestamp for the next request, never going backwards
    fn next_timestamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp();
        self.last_timestamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(now.max(prev))
            })
            .map(|prev| now.max(prev))
            .unwrap_or(now)
    }

    /// One raw attempt: pace, sign, send, classify the response.
    async fn attempt<T>(&self, method: Method, path: &str, body: Option<&str>) -> ApiResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.rate_limiter.acquire().await;

        let timestamp = self.next_timestamp();
        let url = format!("{}{}", self.base_url, path);
        let headers =
            self.credentials
                .auth_headers(timestamp, method.as_str(), path, body.unwrap_or(""));

        let mut request = self.http.request(method, &url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/json")
                .body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        match status.as_u16() {
            200 | 201 => serde_json::from_str(&text)
                .map_err(|e| ApiError::Parse(format!("{} (body: {})", e, text))),
            401 | 403 => Err(ApiError::Auth(text)),
            429 => {
                self.rate_limiter.note_throttled().await;
                Err(ApiError::RateLimited)
            }
            code if status.is_client_error() => Err(ApiError::Validation(format!(
                "API rejected request ({}): {}",
                code, text
            ))),
            code => Err(ApiError::Server {
                status: code,
                body: text,
            }),
        }
    }

    /// Full resilience pipeline around one logical call.
    async fn call<T>(&self, method: Method, path: String, body: Option<String>) -> ApiResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        {
            let mut cb = self.circuit_breaker.lock().await;
            if !cb.can_attempt() {
                return Err(ApiError::CircuitOpen);
            }
        }

        let result = self
            .retry
            .execute(|| {
                let method = method.clone();
                let path = path.clone();
                let body = body.clone();
                let this = self.clone();
                async move { this.attempt(method, &path, body.as_deref()).await }
            })
            .await;

        let mut cb = self.circuit_breaker.lock().await;
        match &result {
            Ok(_) => cb.record_success(),
            // A permanent (4xx) response still proves the backend answered
            Err(err) if err.is_backend_failure() => cb.record_failure(),
            Err(_) => cb.record_success(),
        }

        result
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: impl Into<String>) -> ApiResult<T> {
        self.call(Method::GET, path.into(), None).await
    }

    async fn post<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: impl Into<String>,
        body: &B,
    ) -> ApiResult<T> {
        let body = serde_json::to_string(body)
            .map_err(|e| ApiError::Validation(format!("failed to encode request body: {}", e)))?;
        self.call(Method::POST, path.into(), Some(body)).await
    }

    // ==================== ACCOUNT & MARKET DATA ====================

    /// Verify the credentials by fetching the trading account
    pub async fn authenticate(&self) -> ApiResult<Account> {
        tracing::info!("authenticating with the trading API");
        let account = self.get_account().await?;
        tracing::info!(account = %account.account_number, "authenticated");
        Ok(account)
    }

    pub async fn get_account(&self) -> ApiResult<Account> {
        self.get(ACCOUNTS_ENDPOINT).await
    }

    /// Current buying power in USD
    pub async fn get_buying_power(&self) -> ApiResult<Decimal> {
        Ok(self.get_account().await?.buying_power)
    }

    /// All asset holdings in the account
    pub async fn get_holdings(&self) -> ApiResult<Vec<Holding>> {
        let response: HoldingsResponse = self.get(HOLDINGS_ENDPOINT).await?;
        Ok(response.results)
    }

    /// Quantity of one asset available for trading; zero when not held
    pub async fn get_available_quantity(&self, symbol: &str) -> ApiResult<Decimal> {
        let asset_code = symbol
            .to_uppercase()
            .trim_end_matches("-USD")
            .to_string();
        let holdings = self.get_holdings().await?;
        Ok(holdings
            .iter()
            .find(|h| h.asset_code == asset_code)
            .map(|h| h.quantity_available_for_trading)
            .unwrap_or(Decimal::ZERO))
    }

    /// Current best bid/ask quote for a symbol
    pub async fn get_price(&self, symbol: &str) -> ApiResult<PriceQuote> {
        let symbol = validated_symbol(symbol)?;
        let response: BestBidAskResponse = self
            .get(format!("{}?symbol={}", BEST_BID_ASK_ENDPOINT, symbol))
            .await?;
        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Validation(format!("no price data for {}", symbol)))
    }

    /// All tradeable pairs
    pub async fn get_trading_pairs(&self) -> ApiResult<Vec<TradingPair>> {
        let response: TradingPairsResponse = self.get(TRADING_PAIRS_ENDPOINT).await?;
        Ok(response.results)
    }

    // ==================== ORDERS ====================

    /// List orders, optionally filtered server-side
    pub async fn get_orders(&self, filter: &OrderFilter) -> ApiResult<Vec<Order>> {
        let response: OrdersResponse = self
            .get(format!("{}{}", ORDERS_ENDPOINT, filter.to_query()))
            .await?;
        Ok(response.results)
    }

    /// Place a market order sized by USD notional.
    ///
    /// Buys validate the notional against current buying power locally
    /// and convert it to an asset quantity at the current price, truncated
    /// to 8 decimals so the submitted notional never exceeds the request.
    /// Sells validate the converted quantity against available holdings.
    pub async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        notional: Decimal,
    ) -> ApiResult<Order> {
        let symbol = validated_symbol(symbol)?;
        if notional <= Decimal::ZERO {
            return Err(ApiError::Validation(format!(
                "order notional must be positive, got {}",
                notional
            )));
        }

        let price = self.get_price(&symbol).await?.price;
        if price <= Decimal::ZERO {
            return Err(ApiError::Validation(format!(
                "invalid price data for {}",
                symbol
            )));
        }
        let quantity = notional_to_quantity(notional, price)?;

        match side {
            OrderSide::Buy => {
                let buying_power = self.get_buying_power().await?;
                if notional > buying_power {
                    return Err(ApiError::InsufficientFunds {
                        requested: notional,
                        available: buying_power,
                    });
                }
            }
            OrderSide::Sell => {
                let available = self.get_available_quantity(&symbol).await?;
                if quantity > available {
                    return Err(ApiError::Validation(format!(
                        "insufficient {} balance: requested {}, available {}",
                        symbol, quantity, available
                    )));
                }
            }
        }

        tracing::info!(%symbol, %side, %notional, %quantity, "placing market order");
        self.submit_order(&OrderRequest::market_by_quantity(&symbol, side, quantity))
            .await
    }

    /// Place a market order sized by asset quantity (used for full
    /// position exits, where no price conversion should intervene)
    pub async fn place_market_order_by_quantity(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
    ) -> ApiResult<Order> {
        let symbol = validated_symbol(symbol)?;
        if quantity <= Decimal::ZERO {
            return Err(ApiError::Validation(format!(
                "order quantity must be positive, got {}",
                quantity
            )));
        }
        tracing::info!(%symbol, %side, %quantity, "placing market order by quantity");
        self.submit_order(&OrderRequest::market_by_quantity(&symbol, side, quantity))
            .await
    }

    pub async fn place_limit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        limit_price: Decimal,
    ) -> ApiResult<Order> {
        let symbol = validated_symbol(symbol)?;
        if quantity <= Decimal::ZERO || limit_price <= Decimal::ZERO {
            return Err(ApiError::Validation(
                "limit order quantity and price must be positive".into(),
            ));
        }
        tracing::info!(%symbol, %side, %quantity, %limit_price, "placing limit order");
        self.submit_order(&OrderRequest::limit(&symbol, side, quantity, limit_price))
            .await
    }

    pub async fn place_stop_order(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: Decimal,
        stop_price: Decimal,
    ) -> ApiResult<Order> {
        let symbol = validated_symbol(symbol)?;
        if quantity <= Decimal::ZERO || stop_price <= Decimal::ZERO {
            return Err(ApiError::Validation(
                "stop order quantity and price must be positive".into(),
            ));
        }
        tracing::info!(%symbol, %side, %quantity, %stop_price, "placing stop order");
        self.submit_order(&OrderRequest::stop_loss(&symbol, side, quantity, stop_price))
            .await
    }

    pub async fn cancel_order(&self, order_id: &str) -> ApiResult<()> {
        tracing::info!(order_id, "canceling order");
        let _: serde_json::Value = self
            .post(
                format!("{}{}/cancel/", ORDERS_ENDPOINT, order_id),
                &serde_json::json!({}),
            )
            .await
            .map_err(reject_on_order_endpoint)?;
        Ok(())
    }

    async fn submit_order(&self, request: &OrderRequest) -> ApiResult<Order> {
        self.post(ORDERS_ENDPOINT, request)
            .await
            .map_err(reject_on_order_endpoint)
    }

    // ==================== DIAGNOSTICS ====================

    pub async fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.lock().await.state()
    }

    pub async fn reset_circuit_breaker(&self) {
        self.circuit_breaker.lock().await.reset();
    }
}

/// Convert a USD notional to an asset quantity at the given price,
/// truncated (never rounded up) to the exchange's 8-decimal precision.
pub fn notional_to_quantity(notional: Decimal, price: Decimal) -> ApiResult<Decimal> {
    let raw = notional
        .checked_div(price)
        .ok_or_else(|| ApiError::Validation("division by zero price".into()))?;
    let quantity = raw.round_dp_with_strategy(
        MAX_QUANTITY_DECIMALS,
        rust_decimal::RoundingStrategy::ToZero,
    );
    if quantity <= Decimal::ZERO {
        return Err(ApiError::Validation(format!(
            "notional {} is below the minimum quantity at price {}",
            notional, price
        )));
    }
    Ok(quantity)
}

fn validated_symbol(symbol: &str) -> ApiResult<String> {
    if !symbols::validate(symbol) {
        return Err(ApiError::Validation(format!(
            "invalid symbol format: {:?}",
            symbol
        )));
    }
    Ok(symbols::normalize_to_usd(symbol))
}

/// A 4xx on an order endpoint is an exchange-side business rejection
fn reject_on_order_endpoint(err: ApiError) -> ApiError {
    match err {
        ApiError::Validation(msg) => ApiError::OrderRejected(msg),
        other => other,
    }
}
