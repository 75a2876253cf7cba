//! Strategy evaluation engine
//!
//! Each tick reloads the configured strategies and their state from disk,
//! evaluates them in stable id order, and persists every state transition
//! before moving on to the next strategy. A failure in one strategy is
//! logged and never blocks the others.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::strategy::{
    dca_action, stop_loss_take_profit_action, Action, PositionState, Strategy, StrategyParams,
};
use crate::error::ApiResult;
use crate::robinhood::{notional_to_quantity, OrderSide, RobinhoodClient};
use crate::storage::{StateStore, StrategyStore};

/// Executed market order as the engine records it
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub order_id: String,
    /// Price used to size the order; the entry price of a new position
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Exchange operations the engine depends on
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Current market price for a symbol
    async fn price(&self, symbol: &str) -> ApiResult<Decimal>;
    /// Market buy sized by USD notional
    async fn market_buy_notional(&self, symbol: &str, notional: Decimal) -> ApiResult<Fill>;
    /// Market sell of an exact asset quantity
    async fn market_sell_quantity(&self, symbol: &str, quantity: Decimal) -> ApiResult<Fill>;
}

#[async_trait]
impl Exchange for RobinhoodClient {
    async fn price(&self, symbol: &str) -> ApiResult<Decimal> {
        Ok(self.get_price(symbol).await?.price)
    }

    async fn market_buy_notional(&self, symbol: &str, notional: Decimal) -> ApiResult<Fill> {
        let quote = self.get_price(symbol).await?.price;
        let order = self
            .place_market_order(symbol, OrderSide::Buy, notional)
            .await?;
        let price = order.average_price.unwrap_or(quote);
        let quantity = match order.filled_asset_quantity {
            Some(q) => q,
            None => notional_to_quantity(notional, price)?,
        };
        Ok(Fill {
            order_id: order.id,
            price,
            quantity,
        })
    }

    async fn market_sell_quantity(&self, symbol: &str, quantity: Decimal) -> ApiResult<Fill> {
        let quote = self.get_price(symbol).await?.price;
        let order = self
            .place_market_order_by_quantity(symbol, OrderSide::Sell, quantity)
            .await?;
        Ok(Fill {
            order_id: order.id,
            price: order.average_price.unwrap_or(quote),
            quantity: order.filled_asset_quantity.unwrap_or(quantity),
        })
    }
}

/// Outcome counts for one engine tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub evaluated: usize,
    pub actions: usize,
    pub failures: usize,
}

/// Drives all configured strategies against one exchange
pub struct StrategyEngine<E> {
    pub(crate) exchange: E,
    strategies: StrategyStore,
    state: StateStore,
}

impl<E: Exchange> StrategyEngine<E> {
    pub fn new(exchange: E, strategies: StrategyStore, state: StateStore) -> Self {
        Self {
            exchange,
            strategies,
            state,
        }
    }

    /// Register a new strategy. Ids are `<kind>_<SYMBOL>`, and an id that
    /// is already configured is rejected rather than silently replaced.
    pub fn configure_strategy(&self, strategy: Strategy) -> Result<()> {
        let mut strategies = self.strategies.load();
        if strategies.contains_key(&strategy.id) {
            bail!(
                "strategy {} already exists; remove it before reconfiguring",
                strategy.id
            );
        }
        tracing::info!(id = %strategy.id, symbol = %strategy.symbol, "strategy configured");
        strategies.insert(strategy.id.clone(), strategy);
        self.strategies.save(&strategies)
    }

    /// Remove a strategy and its accumulated position state
    pub fn remove_strategy(&self, id: &str) -> Result<()> {
        let mut strategies = self.strategies.load();
        if strategies.remove(id).is_none() {
            bail!("no strategy with id {}", id);
        }
        self.strategies.save(&strategies)?;

        let mut positions = self.state.load();
        if positions.remove(id).is_some() {
            self.state.save(&positions)?;
        }
        tracing::info!(id, "strategy removed");
        Ok(())
    }

    /// All configured strategies with their current state, in id order
    pub fn list_strategies(&self) -> Vec<(Strategy, PositionState)> {
        let positions = self.state.load();
        self.strategies
            .load()
            .into_values()
            .map(|s| {
                let state = positions.get(&s.id).cloned().unwrap_or_default();
                (s, state)
            })
            .collect()
    }

    /// Evaluate every configured strategy once.
    ///
    /// State is flushed to disk after each strategy that acted, so a crash
    /// mid-tick never repeats an already-executed order on restart.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<TickSummary> {
        let strategies = self.strategies.load();
        let mut positions = self.state.load();
        let mut summary = TickSummary::default();

        for (id, strategy) in &strategies {
            summary.evaluated += 1;
            let mut state = positions.get(id).cloned().unwrap_or_default();

            match self.evaluate(strategy, &mut state, now).await {
                Ok(Action::Hold) => {}
                Ok(action) => {
                    summary.actions += 1;
                    tracing::info!(id = %id, ?action, "strategy acted");
                    positions.insert(id.clone(), state);
                    self.state
                        .save(&positions)
                        .with_context(|| format!("persisting state after {}", id))?;
                }
                Err(err) => {
                    summary.failures += 1;
                    tracing::warn!(id = %id, error = %err, "strategy evaluation failed");
                }
            }
        }

        tracing::debug!(
            evaluated = summary.evaluated,
            actions = summary.actions,
            failures = summary.failures,
            "tick complete"
        );
        Ok(summary)
    }

    async fn evaluate(
        &self,
        strategy: &Strategy,
        state: &mut PositionState,
        now: DateTime<Utc>,
    ) -> ApiResult<Action> {
        match &strategy.params {
            StrategyParams::StopLossTakeProfit {
                stop_loss_pct,
                profit_target_pct,
                position_size,
            } => {
                let price = self.exchange.price(&strategy.symbol).await?;
                let action =
                    stop_loss_take_profit_action(state, price, *stop_loss_pct, *profit_target_pct);
                match action {
                    Action::Enter => {
                        let fill = self
                            .exchange
                            .market_buy_notional(&strategy.symbol, *position_size)
                            .await?;
                        // Entry price is set exactly once per position
                        state.entry_price.get_or_insert(fill.price);
                        state.quantity = Some(fill.quantity);
                        state.last_action_time = Some(now);
                        tracing::info!(
                            symbol = %strategy.symbol,
                            price = %fill.price,
                            quantity = %fill.quantity,
                            "position entered"
                        );
                    }
                    Action::ExitStopLoss | Action::ExitProfitTarget => {
                        if let Some(quantity) = state.quantity.filter(|q| *q > Decimal::ZERO) {
                            let fill = self
                                .exchange
                                .market_sell_quantity(&strategy.symbol, quantity)
                                .await?;
                            tracing::info!(
                                symbol = %strategy.symbol,
                                price = %fill.price,
                                quantity = %fill.quantity,
                                ?action,
                                "position exited"
                            );
                        } else {
                            tracing::warn!(
                                symbol = %strategy.symbol,
                                "exit triggered with no recorded quantity; closing without order"
                            );
                        }
                        state.closed = true;
                        state.quantity = None;
                        state.last_action_time = Some(now);
                    }
                    Action::Purchase | Action::Hold => {}
                }
                Ok(action)
            }
            StrategyParams::Dca {
                amount,
                frequency_days,
                max_purchases,
            } => {
                let action = dca_action(state, now, *frequency_days, *max_purchases);
                if action == Action::Purchase {
                    let fill = self
                        .exchange
                        .market_buy_notional(&strategy.symbol, *amount)
                        .await?;
                    state.purchase_count += 1;
                    state.last_action_time = Some(now);
                    tracing::info!(
                        symbol = %strategy.symbol,
                        price = %fill.price,
                        quantity = %fill.quantity,
                        purchase = state.purchase_count,
                        of = *max_purchases,
                        "scheduled purchase made"
                    );
                }
                Ok(action)
            }
        }
    }
}
