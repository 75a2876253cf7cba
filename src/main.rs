//! Crypto trading agent - main entry point
//!
//! Subcommands:
//! - portfolio / prices / orders: read-only account and market views
//! - buy / sell / cancel: one-off manual orders
//! - strategy: configure automated strategies
//! - run: strategy scheduler loop (ctrl-c to stop)
//! - tick: evaluate all strategies once and exit

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crypto_agent::robinhood::{OrderFilter, OrderSide};
use crypto_agent::storage::{StateStore, StrategyStore};
use crypto_agent::trading::{self, PortfolioRow, Scheduler, StrategyEngine};
use crypto_agent::{RobinhoodClient, Settings, Strategy, StrategyParams};

#[derive(Parser, Debug)]
#[command(name = "crypto-agent")]
#[command(about = "Automated crypto trading against the Robinhood API", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show holdings with market values and buying power
    Portfolio,

    /// Show current prices for one or more symbols
    Prices {
        /// Symbols to quote, e.g. "BTC" or "ETH-USD"
        #[arg(required = true)]
        symbols: Vec<String>,
    },

    /// List recent orders
    Orders {
        /// Restrict to one symbol
        #[arg(short, long)]
        symbol: Option<String>,
    },

    /// Market-buy a USD amount of an asset
    Buy {
        symbol: String,
        /// USD notional to spend
        amount: Decimal,
    },

    /// Market-sell a USD amount of an asset
    Sell {
        symbol: String,
        /// USD notional to sell
        amount: Decimal,
    },

    /// Cancel an open order by id
    Cancel { order_id: String },

    /// Manage automated strategies
    Strategy {
        #[command(subcommand)]
        command: StrategyCommands,
    },

    /// Run the strategy scheduler until interrupted
    Run {
        /// Seconds between evaluation ticks
        #[arg(short, long, default_value = "60")]
        interval: u64,
    },

    /// Evaluate all strategies once and exit
    Tick,
}

#[derive(Subcommand, Debug)]
enum StrategyCommands {
    /// Add a stop-loss/take-profit strategy for a symbol
    AddStopLoss {
        symbol: String,

        /// Exit when price falls this percentage below entry
        #[arg(long)]
        stop_loss_pct: Decimal,

        /// Exit when price rises this percentage above entry
        #[arg(long)]
        profit_target_pct: Decimal,

        /// USD notional of the initial entry
        #[arg(long)]
        position_size: Decimal,
    },

    /// Add a dollar-cost-averaging strategy for a symbol
    AddDca {
        symbol: String,

        /// USD notional of each purchase
        #[arg(long)]
        amount: Decimal,

        /// Days between purchases
        #[arg(long, default_value = "7")]
        frequency_days: i64,

        /// Stop after this many purchases
        #[arg(long)]
        max_purchases: u32,
    },

    /// List configured strategies and their state
    List,

    /// Remove a strategy by id, e.g. "dca_BTC-USD"
    Remove { id: String },
}

fn setup_logging(verbose: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // Filter out noisy transport crates unless explicitly requested
    let level = if verbose { "debug" } else { "info" };
    let filter = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter));

    let file_appender = tracing_appender::rolling::daily("logs", "crypto-agent.log");
    let console_layer = tracing_subscriber::fmt::layer().with_target(true).with_ansi(true);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

fn build_engine(
    client: &RobinhoodClient,
    settings: &Settings,
) -> StrategyEngine<RobinhoodClient> {
    StrategyEngine::new(
        client.clone(),
        StrategyStore::new(settings.strategies_path()),
        StateStore::new(settings.state_path()),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let settings = Settings::from_env()?;
    let client = RobinhoodClient::new(
        &settings.api_key,
        &settings.private_key_b64,
        &settings.api_base_url,
    )?;

    match cli.command {
        Commands::Portfolio => {
            let buying_power = client.get_buying_power().await?;
            let holdings = client.get_holdings().await?;
            let mut rows = Vec::new();
            for holding in holdings
                .iter()
                .filter(|h| h.total_quantity > Decimal::ZERO)
            {
                let price = client
                    .get_price(&format!("{}-USD", holding.asset_code))
                    .await?
                    .price;
                rows.push(PortfolioRow {
                    asset_code: holding.asset_code.clone(),
                    quantity: holding.total_quantity,
                    price,
                });
            }
            print!("{}", trading::format_portfolio(&rows, buying_power));
        }

        Commands::Prices { symbols } => {
            let mut quotes = Vec::new();
            for symbol in &symbols {
                quotes.push(client.get_price(symbol).await?);
            }
            print!("{}", trading::format_prices(&quotes));
        }

        Commands::Orders { symbol } => {
            let filter = OrderFilter {
                symbol,
                ..Default::default()
            };
            let orders = client.get_orders(&filter).await?;
            if orders.is_empty() {
                println!("no orders");
            }
            for order in orders {
                println!(
                    "{}  {}  {} {:?}  {:?}",
                    order.id, order.symbol, order.side, order.order_type, order.state
                );
            }
        }

        Commands::Buy { symbol, amount } => {
            let order = client
                .place_market_order(&symbol, OrderSide::Buy, amount)
                .await?;
            println!("order {}: buy ${} of {}", order.id, amount, order.symbol);
        }

        Commands::Sell { symbol, amount } => {
            let order = client
                .place_market_order(&symbol, OrderSide::Sell, amount)
                .await?;
            println!("order {}: sell ${} of {}", order.id, amount, order.symbol);
        }

        Commands::Cancel { order_id } => {
            client.cancel_order(&order_id).await?;
            println!("cancel requested for {}", order_id);
        }

        Commands::Strategy { command } => {
            let engine = build_engine(&client, &settings);
            match command {
                StrategyCommands::AddStopLoss {
                    symbol,
                    stop_loss_pct,
                    profit_target_pct,
                    position_size,
                } => {
                    let strategy = Strategy::new(
                        &symbol,
                        StrategyParams::StopLossTakeProfit {
                            stop_loss_pct,
                            profit_target_pct,
                            position_size,
                        },
                    )?;
                    let id = strategy.id.clone();
                    engine.configure_strategy(strategy)?;
                    println!("added {}", id);
                }
                StrategyCommands::AddDca {
                    symbol,
                    amount,
                    frequency_days,
                    max_purchases,
                } => {
                    let strategy = Strategy::new(
                        &symbol,
                        StrategyParams::Dca {
                            amount,
                            frequency_days,
                            max_purchases,
                        },
                    )?;
                    let id = strategy.id.clone();
                    engine.configure_strategy(strategy)?;
                    println!("added {}", id);
                }
                StrategyCommands::List => {
                    print!("{}", trading::format_strategies(&engine.list_strategies()));
                }
                StrategyCommands::Remove { id } => {
                    engine.remove_strategy(&id)?;
                    println!("removed {}", id);
                }
            }
        }

        Commands::Run { interval } => {
            client.authenticate().await?;
            Scheduler::new(build_engine(&client, &settings))
                .with_interval(Duration::from_secs(interval))
                .run()
                .await?;
        }

        Commands::Tick => {
            let summary = build_engine(&client, &settings)
                .run_once(chrono::Utc::now())
                .await?;
            println!(
                "evaluated {} strategies: {} actions, {} failures",
                summary.evaluated, summary.actions, summary.failures
            );
        }
    }

    Ok(())
}
