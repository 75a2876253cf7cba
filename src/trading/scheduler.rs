//! Fixed-interval polling loop around the strategy engine

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::time::MissedTickBehavior;

use super::engine::{Exchange, StrategyEngine};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Runs the engine on a fixed cadence until shutdown is requested.
///
/// Ticks never overlap: the next tick is not started until the previous
/// one has finished, and a delayed tick pushes the whole schedule back
/// rather than bursting to catch up.
pub struct Scheduler<E> {
    engine: StrategyEngine<E>,
    interval: Duration,
}

impl<E: Exchange> Scheduler<E> {
    pub fn new(engine: StrategyEngine<E>) -> Self {
        Self {
            engine,
            interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until ctrl-c. An in-flight tick finishes before the loop
    /// exits, so no state transition is interrupted.
    pub async fn run(&self) -> Result<()> {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to install shutdown handler");
                std::future::pending::<()>().await;
            }
        };
        self.run_until(ctrl_c).await
    }

    /// Run until the given future resolves. The first tick fires
    /// immediately on startup.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "scheduler started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, stopping scheduler");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    match self.engine.run_once(Utc::now()).await {
                        Ok(summary) => tracing::debug!(
                            evaluated = summary.evaluated,
                            actions = summary.actions,
                            failures = summary.failures,
                            "tick finished"
                        ),
                        Err(e) => tracing::error!(error = %e, "tick failed"),
                    }
                }
            }
        }
    }
}
