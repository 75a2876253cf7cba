//! Wire types for the trading API
//!
//! Monetary and quantity fields travel as JSON strings to preserve
//! precision; they are decoded straight into `rust_decimal::Decimal`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Crypto trading account
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub account_number: String,
    pub status: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub buying_power: Decimal,
    #[serde(default)]
    pub buying_power_currency: Option<String>,
}

/// Paginated holdings listing
#[derive(Debug, Clone, Deserialize)]
pub struct HoldingsResponse {
    pub results: Vec<Holding>,
    #[serde(default)]
    pub next: Option<String>,
}

/// One asset position held in the account
#[derive(Debug, Clone, Deserialize)]
pub struct Holding {
    pub asset_code: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_quantity: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub quantity_available_for_trading: Decimal,
}

/// Best bid/ask listing for one or more symbols
#[derive(Debug, Clone, Deserialize)]
pub struct BestBidAskResponse {
    pub results: Vec<PriceQuote>,
}

/// Mid-market quote for a trading pair
#[derive(Debug, Clone, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub bid_inclusive_of_sell_spread: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub ask_inclusive_of_buy_spread: Option<Decimal>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Paginated trading-pair listing
#[derive(Debug, Clone, Deserialize)]
pub struct TradingPairsResponse {
    pub results: Vec<TradingPair>,
    #[serde(default)]
    pub next: Option<String>,
}

/// One tradeable pair and its order-size limits
#[derive(Debug, Clone, Deserialize)]
pub struct TradingPair {
    pub symbol: String,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub min_order_size: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub max_order_size: Option<Decimal>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
}

/// Exchange-side order lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Open,
    PartiallyFilled,
    Filled,
    Canceled,
    Failed,
}

/// Order record as returned by the exchange. The `id` is always assigned
/// server-side; the client only ever supplies `client_order_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: String,
    pub client_order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub state: OrderState,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub filled_asset_quantity: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub average_price: Option<Decimal>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Paginated order listing
#[derive(Debug, Clone, Deserialize)]
pub struct OrdersResponse {
    pub results: Vec<Order>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Parameters of a market order; exactly one of `asset_quantity` /
/// `quote_amount` is set
#[derive(Debug, Clone, Serialize)]
pub struct MarketOrderConfig {
    #[serde(
        with = "rust_decimal::serde::str_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub asset_quantity: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::str_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub quote_amount: Option<Decimal>,
}

/// Parameters of a limit order
#[derive(Debug, Clone, Serialize)]
pub struct LimitOrderConfig {
    #[serde(with = "rust_decimal::serde::str")]
    pub asset_quantity: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub limit_price: Decimal,
    pub time_in_force: String,
}

/// Parameters of a stop-loss order
#[derive(Debug, Clone, Serialize)]
pub struct StopOrderConfig {
    #[serde(with = "rust_decimal::serde::str")]
    pub asset_quantity: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub stop_price: Decimal,
    pub time_in_force: String,
}

/// Outbound order submission
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub client_order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_order_config: Option<MarketOrderConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_order_config: Option<LimitOrderConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss_order_config: Option<StopOrderConfig>,
}

impl OrderRequest {
    fn new(symbol: &str, side: OrderSide, order_type: OrderType) -> Self {
        Self {
            client_order_id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.to_uppercase(),
            side,
            order_type,
            market_order_config: None,
            limit_order_config: None,
            stop_loss_order_config: None,
        }
    }

    /// Market order sized by asset quantity
    pub fn market_by_quantity(symbol: &str, side: OrderSide, asset_quantity: Decimal) -> Self {
        let mut req = Self::new(symbol, side, OrderType::Market);
        req.market_order_config = Some(MarketOrderConfig {
            asset_quantity: Some(asset_quantity),
            quote_amount: None,
        });
        req
    }

    /// Limit order at a fixed price, good-till-canceled
    pub fn limit(
        symbol: &str,
        side: OrderSide,
        asset_quantity: Decimal,
        limit_price: Decimal,
    ) -> Self {
        let mut req = Self::new(symbol, side, OrderType::Limit);
        req.limit_order_config = Some(LimitOrderConfig {
            asset_quantity,
            limit_price,
            time_in_force: "gtc".to_string(),
        });
        req
    }

    /// Stop-loss order triggered at a stop price, good-till-canceled
    pub fn stop_loss(
        symbol: &str,
        side: OrderSide,
        asset_quantity: Decimal,
        stop_price: Decimal,
    ) -> Self {
        let mut req = Self::new(symbol, side, OrderType::StopLoss);
        req.stop_loss_order_config = Some(StopOrderConfig {
            asset_quantity,
            stop_price,
            time_in_force: "gtc".to_string(),
        });
        req
    }
}

/// Server-side filters for listing orders
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub symbol: Option<String>,
    pub side: Option<OrderSide>,
    pub state: Option<OrderState>,
}

impl OrderFilter {
    /// Render as a query string, empty when no filters are set
    pub fn to_query(&self) -> String {
        let mut params = Vec::new();
        if let Some(symbol) = &self.symbol {
            params.push(format!("symbol={}", symbol.to_uppercase()));
        }
        if let Some(side) = self.side {
            params.push(format!("side={}", side));
        }
        if let Some(state) = self.state {
            let state = match state {
                OrderState::Open => "open",
                OrderState::PartiallyFilled => "partially_filled",
                OrderState::Filled => "filled",
                OrderState::Canceled => "canceled",
                OrderState::Failed => "failed",
            };
            params.push(format!("state={}", state));
        }
        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_order_serializes_quantity_as_string() {
        let req = OrderRequest::market_by_quantity("btc-usd", OrderSide::Buy, dec!(0.00020000));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["symbol"], "BTC-USD");
        assert_eq!(json["side"], "buy");
        assert_eq!(json["type"], "market");
        assert_eq!(json["market_order_config"]["asset_quantity"], "0.00020000");
        assert!(json["market_order_config"]
            .as_object()
            .unwrap()
            .get("quote_amount")
            .is_none());
        assert!(json.get("limit_order_config").is_none());
    }

    #[test]
    fn test_client_order_ids_are_unique() {
        let a = OrderRequest::market_by_quantity("BTC-USD", OrderSide::Buy, dec!(1));
        let b = OrderRequest::market_by_quantity("BTC-USD", OrderSide::Buy, dec!(1));
        assert_ne!(a.client_order_id, b.client_order_id);
    }

    #[test]
    fn test_order_deserializes_string_decimals() {
        let json = r#"{
            "id": "ord-1",
            "client_order_id": "cli-1",
            "symbol": "BTC-USD",
            "side": "buy",
            "type": "market",
            "state": "filled",
            "filled_asset_quantity": "0.00020000",
            "average_price": "50000.00"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, "ord-1");
        assert_eq!(order.state, OrderState::Filled);
        assert_eq!(order.filled_asset_quantity, Some(dec!(0.00020000)));
        assert_eq!(order.average_price, Some(dec!(50000.00)));
    }

    #[test]
    fn test_order_filter_query() {
        assert_eq!(OrderFilter::default().to_query(), "");

        let filter = OrderFilter {
            symbol: Some("btc-usd".to_string()),
            side: Some(OrderSide::Sell),
            state: Some(OrderState::Open),
        };
        assert_eq!(filter.to_query(), "?symbol=BTC-USD&side=sell&state=open");
    }

    #[test]
    fn test_account_buying_power_parses() {
        let json = r#"{
            "account_number": "A1",
            "status": "active",
            "buying_power": "1234.56",
            "buying_power_currency": "USD"
        }"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.buying_power, dec!(1234.56));
    }
}
