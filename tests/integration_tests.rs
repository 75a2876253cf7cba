//! Integration tests for the trading agent
//!
//! These tests drive the strategy engine end to end against a scripted
//! exchange and on-disk stores, covering the full persistence cycle.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crypto_agent::error::{ApiError, ApiResult};
use crypto_agent::robinhood::notional_to_quantity;
use crypto_agent::storage::{StateStore, StrategyStore};
use crypto_agent::trading::{Exchange, Fill, PositionState, StrategyEngine};
use crypto_agent::{Strategy, StrategyParams};

// =============================================================================
// Test Utilities
// =============================================================================

/// Scripted exchange: per-symbol prices set by the test, all orders
/// recorded and filled instantly at the current price.
#[derive(Clone, Default)]
struct ScriptedExchange {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    prices: Mutex<BTreeMap<String, Decimal>>,
    buys: Mutex<Vec<(String, Decimal)>>,
    sells: Mutex<Vec<(String, Decimal)>>,
}

impl ScriptedExchange {
    fn with_price(symbol: &str, price: Decimal) -> Self {
        let exchange = Self::default();
        exchange.set_price(symbol, price);
        exchange
    }

    fn set_price(&self, symbol: &str, price: Decimal) {
        self.inner
            .prices
            .lock()
            .unwrap()
            .insert(symbol.to_string(), price);
    }

    fn quote(&self, symbol: &str) -> ApiResult<Decimal> {
        self.inner
            .prices
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| ApiError::Network(format!("no quote for {}", symbol)))
    }

    fn buys(&self) -> Vec<(String, Decimal)> {
        self.inner.buys.lock().unwrap().clone()
    }

    fn sells(&self) -> Vec<(String, Decimal)> {
        self.inner.sells.lock().unwrap().clone()
    }
}

#[async_trait]
impl Exchange for ScriptedExchange {
    async fn price(&self, symbol: &str) -> ApiResult<Decimal> {
        self.quote(symbol)
    }

    async fn market_buy_notional(&self, symbol: &str, notional: Decimal) -> ApiResult<Fill> {
        let price = self.quote(symbol)?;
        let quantity = notional_to_quantity(notional, price)?;
        let mut buys = self.inner.buys.lock().unwrap();
        buys.push((symbol.to_string(), notional));
        Ok(Fill {
            order_id: format!("buy-{}", buys.len()),
            price,
            quantity,
        })
    }

    async fn market_sell_quantity(&self, symbol: &str, quantity: Decimal) -> ApiResult<Fill> {
        let price = self.quote(symbol)?;
        let mut sells = self.inner.sells.lock().unwrap();
        sells.push((symbol.to_string(), quantity));
        Ok(Fill {
            order_id: format!("sell-{}", sells.len()),
            price,
            quantity,
        })
    }
}

fn engine(
    exchange: &ScriptedExchange,
    dir: &std::path::Path,
) -> StrategyEngine<ScriptedExchange> {
    StrategyEngine::new(
        exchange.clone(),
        StrategyStore::new(dir.join("strategies.json")),
        StateStore::new(dir.join("state.json")),
    )
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, d, 9, 0, 0).unwrap()
}

// =============================================================================
// Stop-Loss / Take-Profit Lifecycle
// =============================================================================

#[tokio::test]
async fn test_profit_target_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let exchange = ScriptedExchange::with_price("BTC-USD", dec!(100));
    let engine = engine(&exchange, dir.path());

    engine
        .configure_strategy(
            Strategy::new(
                "BTC",
                StrategyParams::StopLossTakeProfit {
                    stop_loss_pct: dec!(5),
                    profit_target_pct: dec!(15),
                    position_size: dec!(100),
                },
            )
            .unwrap(),
        )
        .unwrap();

    // Tick 1: enter at $100 with a $100 notional
    engine.run_once(day(1)).await.unwrap();
    assert_eq!(exchange.buys(), vec![("BTC-USD".to_string(), dec!(100))]);

    // Up 5%: within both thresholds, hold
    exchange.set_price("BTC-USD", dec!(105));
    engine.run_once(day(2)).await.unwrap();
    assert!(exchange.sells().is_empty());

    // Up 16%: profit target reached, full position sold
    exchange.set_price("BTC-USD", dec!(116));
    engine.run_once(day(3)).await.unwrap();
    assert_eq!(exchange.sells(), vec![("BTC-USD".to_string(), dec!(1))]);

    let (_, state) = engine.list_strategies().pop().unwrap();
    assert!(state.closed);
    assert_eq!(state.entry_price, Some(dec!(100)));

    // Closed position never re-enters or re-exits
    exchange.set_price("BTC-USD", dec!(200));
    engine.run_once(day(4)).await.unwrap();
    assert_eq!(exchange.buys().len(), 1);
    assert_eq!(exchange.sells().len(), 1);
}

#[tokio::test]
async fn test_entry_price_is_set_once() {
    let dir = tempfile::tempdir().unwrap();
    let exchange = ScriptedExchange::with_price("ETH-USD", dec!(2000));
    let engine = engine(&exchange, dir.path());

    engine
        .configure_strategy(
            Strategy::new(
                "ETH-USD",
                StrategyParams::StopLossTakeProfit {
                    stop_loss_pct: dec!(10),
                    profit_target_pct: dec!(20),
                    position_size: dec!(500),
                },
            )
            .unwrap(),
        )
        .unwrap();

    engine.run_once(day(1)).await.unwrap();

    // Later price moves never touch the recorded entry
    exchange.set_price("ETH-USD", dec!(2100));
    engine.run_once(day(2)).await.unwrap();
    let (_, state) = engine.list_strategies().pop().unwrap();
    assert_eq!(state.entry_price, Some(dec!(2000)));
}

// =============================================================================
// Dollar-Cost Averaging Schedule
// =============================================================================

#[tokio::test]
async fn test_dca_schedule_to_exhaustion() {
    let dir = tempfile::tempdir().unwrap();
    let exchange = ScriptedExchange::with_price("BTC-USD", dec!(50000));
    let engine = engine(&exchange, dir.path());

    engine
        .configure_strategy(
            Strategy::new(
                "BTC",
                StrategyParams::Dca {
                    amount: dec!(25),
                    frequency_days: 7,
                    max_purchases: 3,
                },
            )
            .unwrap(),
        )
        .unwrap();

    // Purchases on days 1, 8 and 15; nothing in between or after
    engine.run_once(day(1)).await.unwrap();
    engine.run_once(day(5)).await.unwrap();
    engine.run_once(day(8)).await.unwrap();
    engine.run_once(day(15)).await.unwrap();
    engine.run_once(day(22)).await.unwrap();

    assert_eq!(exchange.buys().len(), 3);
    let (_, state) = engine.list_strategies().pop().unwrap();
    assert_eq!(state.purchase_count, 3);
    assert_eq!(state.last_action_time, Some(day(15)));
}

// =============================================================================
// Crash Recovery and Store Integrity
// =============================================================================

#[tokio::test]
async fn test_restart_does_not_repeat_actions() {
    let dir = tempfile::tempdir().unwrap();
    let exchange = ScriptedExchange::with_price("BTC-USD", dec!(50000));

    {
        let engine = engine(&exchange, dir.path());
        engine
            .configure_strategy(
                Strategy::new(
                    "BTC",
                    StrategyParams::Dca {
                        amount: dec!(25),
                        frequency_days: 7,
                        max_purchases: 3,
                    },
                )
                .unwrap(),
            )
            .unwrap();
        engine.run_once(day(1)).await.unwrap();
    }
    assert_eq!(exchange.buys().len(), 1);

    // A fresh process over the same data dir picks up where it left off
    let engine = engine(&exchange, dir.path());
    engine.run_once(day(2)).await.unwrap();
    assert_eq!(exchange.buys().len(), 1);
    engine.run_once(day(8)).await.unwrap();
    assert_eq!(exchange.buys().len(), 2);
}

#[tokio::test]
async fn test_corrupt_stores_start_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("strategies.json"), "{not json").unwrap();
    std::fs::write(dir.path().join("state.json"), "\0\0").unwrap();

    let exchange = ScriptedExchange::default();
    let engine = engine(&exchange, dir.path());

    assert!(engine.list_strategies().is_empty());
    let summary = engine.run_once(day(1)).await.unwrap();
    assert_eq!(summary.evaluated, 0);

    // The corrupt file is replaced on the next successful save
    engine
        .configure_strategy(
            Strategy::new(
                "BTC",
                StrategyParams::Dca {
                    amount: dec!(25),
                    frequency_days: 7,
                    max_purchases: 1,
                },
            )
            .unwrap(),
        )
        .unwrap();
    assert_eq!(engine.list_strategies().len(), 1);
}

#[test]
fn test_strategy_file_format_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strategies.json");
    std::fs::write(
        &path,
        r#"{
            "strategies": [
                {
                    "id": "stop_loss_BTC-USD",
                    "symbol": "BTC-USD",
                    "kind": "stop_loss_take_profit",
                    "stop_loss_pct": "5",
                    "profit_target_pct": "15",
                    "position_size": "100"
                },
                {
                    "id": "dca_ETH-USD",
                    "symbol": "ETH-USD",
                    "kind": "dca",
                    "amount": "50",
                    "frequency_days": 7,
                    "max_purchases": 4
                }
            ]
        }"#,
    )
    .unwrap();

    let strategies = StrategyStore::new(path).load();
    assert_eq!(strategies.len(), 2);
    assert_eq!(
        strategies["dca_ETH-USD"].params,
        StrategyParams::Dca {
            amount: dec!(50),
            frequency_days: 7,
            max_purchases: 4,
        }
    );
}

// =============================================================================
// Failure Isolation
// =============================================================================

#[tokio::test]
async fn test_unquoted_symbol_does_not_poison_the_tick() {
    let dir = tempfile::tempdir().unwrap();
    // Only ETH has a quote; the BTC strategy fails every tick
    let exchange = ScriptedExchange::with_price("ETH-USD", dec!(2000));
    let engine = engine(&exchange, dir.path());

    for symbol in ["BTC", "ETH"] {
        engine
            .configure_strategy(
                Strategy::new(
                    symbol,
                    StrategyParams::Dca {
                        amount: dec!(25),
                        frequency_days: 7,
                        max_purchases: 3,
                    },
                )
                .unwrap(),
            )
            .unwrap();
    }

    let summary = engine.run_once(day(1)).await.unwrap();
    assert_eq!(summary.evaluated, 2);
    assert_eq!(summary.failures, 1);
    assert_eq!(exchange.buys(), vec![("ETH-USD".to_string(), dec!(25))]);

    // The failed strategy left no state behind
    let states: BTreeMap<String, PositionState> =
        StateStore::new(dir.path().join("state.json")).load();
    assert!(!states.contains_key("dca_BTC-USD"));
    assert_eq!(states["dca_ETH-USD"].purchase_count, 1);
}
