//! Strategy model and decision rules
//!
//! A strategy is a user-declared automation rule over one symbol. The
//! decision helpers here are pure functions over prices and persisted
//! state, so the trigger logic is testable without a clock or network.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Parameters of one strategy kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyParams {
    /// Enter a position once, then exit on a stop-loss or profit-target
    /// percentage move from the entry price
    StopLossTakeProfit {
        stop_loss_pct: Decimal,
        profit_target_pct: Decimal,
        /// USD notional of the initial entry
        position_size: Decimal,
    },
    /// Buy a fixed USD amount at a fixed cadence
    Dca {
        amount: Decimal,
        frequency_days: i64,
        max_purchases: u32,
    },
}

impl StrategyParams {
    /// Short tag used in strategy ids and log lines
    pub fn kind_tag(&self) -> &'static str {
        match self {
            StrategyParams::StopLossTakeProfit { .. } => "stop_loss",
            StrategyParams::Dca { .. } => "dca",
        }
    }

    pub fn validate(&self) -> ApiResult<()> {
        let positive = |name: &str, v: Decimal| {
            if v > Decimal::ZERO {
                Ok(())
            } else {
                Err(ApiError::Validation(format!(
                    "{} must be positive, got {}",
                    name, v
                )))
            }
        };
        match self {
            StrategyParams::StopLossTakeProfit {
                stop_loss_pct,
                profit_target_pct,
                position_size,
            } => {
                positive("stop_loss_pct", *stop_loss_pct)?;
                positive("profit_target_pct", *profit_target_pct)?;
                positive("position_size", *position_size)
            }
            StrategyParams::Dca {
                amount,
                frequency_days,
                max_purchases,
            } => {
                positive("amount", *amount)?;
                if *frequency_days <= 0 {
                    return Err(ApiError::Validation(format!(
                        "frequency_days must be positive, got {}",
                        frequency_days
                    )));
                }
                if *max_purchases == 0 {
                    return Err(ApiError::Validation(
                        "max_purchases must be positive".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// One configured automation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: String,
    pub symbol: String,
    #[serde(flatten)]
    pub params: StrategyParams,
}

impl Strategy {
    /// Build a validated strategy; the id is `<kind>_<SYMBOL>`, so at
    /// most one strategy of each kind exists per symbol.
    pub fn new(symbol: &str, params: StrategyParams) -> ApiResult<Self> {
        if !crate::symbols::validate(symbol) {
            return Err(ApiError::Validation(format!(
                "invalid symbol format: {:?}",
                symbol
            )));
        }
        params.validate()?;
        let symbol = crate::symbols::normalize_to_usd(symbol);
        let id = format!("{}_{}", params.kind_tag(), symbol);
        Ok(Self { id, symbol, params })
    }
}

/// Runtime progress of one strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    /// Fill price of the first entry; set once, immutable thereafter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_price: Option<Decimal>,
    /// Quantity bought at entry, needed to exit the full position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub purchase_count: u32,
    /// Terminal marker for exited stop-loss/take-profit positions
    #[serde(default)]
    pub closed: bool,
}

/// Decision produced by evaluating one strategy against market state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Open the initial position (stop-loss/take-profit entry)
    Enter,
    /// Exit the full position because price fell through the stop
    ExitStopLoss,
    /// Exit the full position because price reached the target
    ExitProfitTarget,
    /// Make one scheduled DCA purchase
    Purchase,
    /// Nothing to do this tick
    Hold,
}

/// Evaluate a stop-loss/take-profit strategy.
///
/// With no live entry the action is `Enter`. Holding, the percentage
/// move from entry decides the exit; when both thresholds are crossed in
/// the same tick, the stop-loss wins (capital preservation outranks
/// profit-taking). A closed position stays closed.
pub fn stop_loss_take_profit_action(
    state: &PositionState,
    current_price: Decimal,
    stop_loss_pct: Decimal,
    profit_target_pct: Decimal,
) -> Action {
    if state.closed {
        return Action::Hold;
    }
    let entry_price = match state.entry_price {
        Some(p) if p > Decimal::ZERO => p,
        _ => return Action::Enter,
    };

    let pct_change = (current_price - entry_price) / entry_price * dec!(100);
    if pct_change <= -stop_loss_pct {
        Action::ExitStopLoss
    } else if pct_change >= profit_target_pct {
        Action::ExitProfitTarget
    } else {
        Action::Hold
    }
}

/// Evaluate a DCA strategy: a purchase is due when the budget is not yet
/// exhausted and at least `frequency_days` have passed since the last
/// purchase (or none has been made yet).
pub fn dca_action(
    state: &PositionState,
    now: DateTime<Utc>,
    frequency_days: i64,
    max_purchases: u32,
) -> Action {
    if state.purchase_count >= max_purchases {
        return Action::Hold;
    }
    let due = match state.last_action_time {
        None => true,
        Some(last) => now - last >= Duration::days(frequency_days),
    };
    if due {
        Action::Purchase
    } else {
        Action::Hold
    }
}
