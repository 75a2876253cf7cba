//! Strategy model, evaluation engine, and polling scheduler

pub mod engine;
pub mod scheduler;
pub mod strategy;

pub use engine::{Exchange, Fill, StrategyEngine, TickSummary};
pub use scheduler::{Scheduler, DEFAULT_TICK_INTERVAL};
pub use strategy::{Action, PositionState, Strategy, StrategyParams};

use rust_decimal::Decimal;

use crate::robinhood::PriceQuote;

/// One priced holding, ready for display
#[derive(Debug, Clone)]
pub struct PortfolioRow {
    pub asset_code: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl PortfolioRow {
    pub fn market_value(&self) -> Decimal {
        self.quantity * self.price
    }
}

/// Render holdings as a plain text table with totals and buying power
pub fn format_portfolio(rows: &[PortfolioRow], buying_power: Decimal) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<8} {:>18} {:>14} {:>14}\n",
        "ASSET", "QUANTITY", "PRICE", "VALUE"
    ));

    let mut total = Decimal::ZERO;
    for row in rows {
        let value = row.market_value();
        total += value;
        out.push_str(&format!(
            "{:<8} {:>18} {:>14} {:>14}\n",
            row.asset_code,
            row.quantity.normalize(),
            format!("${:.2}", row.price),
            format!("${:.2}", value),
        ));
    }

    out.push_str(&format!(
        "\nHoldings value: ${:.2}\nBuying power:   ${:.2}\nTotal:          ${:.2}\n",
        total,
        buying_power,
        total + buying_power,
    ));
    out
}

/// Render current quotes as a plain text table
pub fn format_prices(quotes: &[PriceQuote]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<12} {:>14}\n", "SYMBOL", "PRICE"));
    for quote in quotes {
        out.push_str(&format!(
            "{:<12} {:>14}\n",
            quote.symbol,
            format!("${:.2}", quote.price),
        ));
    }
    out
}

/// Render configured strategies with their runtime state
pub fn format_strategies(entries: &[(Strategy, PositionState)]) -> String {
    if entries.is_empty() {
        return "no strategies configured\n".to_string();
    }

    let mut out = String::new();
    for (strategy, state) in entries {
        match &strategy.params {
            StrategyParams::StopLossTakeProfit {
                stop_loss_pct,
                profit_target_pct,
                position_size,
            } => {
                let status = if state.closed {
                    "closed".to_string()
                } else {
                    match state.entry_price {
                        Some(entry) => format!("holding (entry ${:.2})", entry),
                        None => "awaiting entry".to_string(),
                    }
                };
                out.push_str(&format!(
                    "{}  stop {}% / target {}% / ${}  [{}]\n",
                    strategy.id, stop_loss_pct, profit_target_pct, position_size, status
                ));
            }
            StrategyParams::Dca {
                amount,
                frequency_days,
                max_purchases,
            } => {
                out.push_str(&format!(
                    "{}  ${} every {}d  [{}/{} purchases]\n",
                    strategy.id, amount, frequency_days, state.purchase_count, max_purchases
                ));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_portfolio_table_totals() {
        let rows = vec![
            PortfolioRow {
                asset_code: "BTC".to_string(),
                quantity: dec!(0.5),
                price: dec!(50000),
            },
            PortfolioRow {
                asset_code: "ETH".to_string(),
                quantity: dec!(2),
                price: dec!(2500),
            },
        ];
        let out = format_portfolio(&rows, dec!(1000));
        assert!(out.contains("BTC"));
        assert!(out.contains("$25000.00"));
        assert!(out.contains("Holdings value: $30000.00"));
        assert!(out.contains("Total:          $31000.00"));
    }

    #[test]
    fn test_strategy_listing_shows_progress() {
        let strategy = Strategy::new(
            "BTC-USD",
            StrategyParams::Dca {
                amount: dec!(50),
                frequency_days: 7,
                max_purchases: 4,
            },
        )
        .unwrap();
        let state = PositionState {
            purchase_count: 2,
            ..Default::default()
        };
        let out = format_strategies(&[(strategy, state)]);
        assert!(out.contains("dca_BTC-USD"));
        assert!(out.contains("[2/4 purchases]"));

        assert_eq!(format_strategies(&[]), "no strategies configured\n");
    }
}
