use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::lifecycle::AuctionLifecycle;

/// Periodically expires listings nobody completed.
pub struct ExpirySweeper {
    lifecycle: Arc<AuctionLifecycle>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(lifecycle: Arc<AuctionLifecycle>, interval: Duration) -> Self {
        Self {
            lifecycle,
            interval,
        }
    }

    /// Run one pass now. Errors are logged.
    pub async fn tick(&self) {
        match self.lifecycle.sweep_expired().await {
            Ok(report) => {
                if report.failed > 0 {
                    tracing::warn!(failed = report.failed, "expiry sweep left listings behind");
                }
            }
            Err(err) => tracing::error!(error = %err, "expiry sweep failed"),
        }
    }

    /// Spawn the periodic loop. It stops when `shutdown` flips to `true` or
    /// its sender is dropped.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            tracing::info!(interval = ?self.interval, "expiry sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.tick().await,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("expiry sweeper stopped");
        })
    }
}
