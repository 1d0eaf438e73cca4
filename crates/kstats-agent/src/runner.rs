//! Fixed-interval scheduling of collection cycles

use async_trait::async_trait;
use kstats_core::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A unit of work driven by [`IntervalRunner`]
#[async_trait]
pub trait Runnable: Send + Sync {
    /// Called once before the first `run`
    async fn setup(&self) -> Result<()>;

    /// Run one cycle. Errors are logged by the runner and never stop it.
    async fn run(&self) -> Result<()>;
}

/// Runs a [`Runnable`] on a fixed interval until cancelled
#[derive(Debug, Clone)]
pub struct IntervalRunner {
    period: Duration,
    cancel: CancellationToken,
}

impl IntervalRunner {
    pub fn new(period: Duration, cancel: CancellationToken) -> Self {
        Self { period, cancel }
    }

    /// Run `setup` and then one cycle per tick until the token fires.
    ///
    /// Cycles never overlap; a tick missed because a cycle ran long is skipped.
    pub async fn start(&self, runnable: Arc<dyn Runnable>) -> Result<()> {
        runnable.setup().await?;

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("Collection loop started with a {:?} interval", self.period);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Collection loop stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    match runnable.run().await {
                        Ok(()) => debug!("Collection cycle completed"),
                        Err(e) if e.is_retryable() => warn!("Collection cycle failed: {}", e),
                        Err(e) => error!("Collection cycle failed: {}", e),
                    }
                }
            }
        }
    }

    /// Spawn the loop onto the runtime
    pub fn spawn(self, runnable: Arc<dyn Runnable>) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.start(runnable).await })
    }
}
