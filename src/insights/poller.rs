//! Periodic driver for the scan job processor.

use super::processor::ScanJobProcessor;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Invokes one processing pass per tick until shut down.
///
/// A pass is awaited before the next tick is taken, so passes of one poller
/// never overlap. Ticks missed while a pass runs long are dropped.
pub struct ScanPoller {
    processor: Arc<ScanJobProcessor>,
    interval: Duration,
}

impl ScanPoller {
    pub fn new(processor: Arc<ScanJobProcessor>, interval: Duration) -> Self {
        Self {
            processor,
            interval,
        }
    }

    /// Main polling loop - call from a spawned task.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            "Scan poller starting (interval={}s)",
            self.interval.as_secs_f64()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let summary = self.processor.process_pending_jobs().await;
                    debug!("Scan poller tick done: {:?}", summary);
                }
                _ = shutdown.cancelled() => {
                    info!("Scan poller shutting down");
                    break;
                }
            }
        }
    }
}
