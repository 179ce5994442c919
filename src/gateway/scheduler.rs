//! Sweep scheduler: poll every subscription now, then again on a fixed interval.

use crate::engine::{Engine, PollOutcome};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Totals for one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub polled: usize,
    /// Polls that ended in an error (adapter, store).
    pub errors: usize,
    pub delivered: usize,
    pub failed_deliveries: usize,
}

/// Drives sweeps over all subscriptions.
pub struct Scheduler {
    engine: Arc<Engine>,
    interval: Duration,
    max_concurrent: usize,
}

impl Scheduler {
    pub fn new(engine: Arc<Engine>, interval: Duration, max_concurrent: usize) -> Self {
        Self {
            engine,
            interval,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Poll every subscription once.
    ///
    /// At most `max_concurrent` polls talk to the activity source at once;
    /// deliveries run outside that bound. A failed poll is logged and counted
    /// and never stops the rest of the sweep.
    pub async fn sweep(&self) -> SweepReport {
        let keys = self.engine.keys().await;
        let started = Instant::now();
        info!("sweep started: {} subscriptions", keys.len());

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (channel_id, account_id) in keys {
            let engine = self.engine.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(slot) => engine.poll_one_in_slot(&channel_id, account_id, slot).await,
                    Err(_) => engine.poll_one(&channel_id, account_id).await,
                };
                (channel_id, account_id, result)
            });
        }

        let mut report = SweepReport::default();
        while let Some(joined) = tasks.join_next().await {
            let (channel_id, account_id, result) = match joined {
                Ok(r) => r,
                Err(e) => {
                    error!("poll task panicked: {e}");
                    report.errors += 1;
                    continue;
                }
            };
            report.polled += 1;
            match result {
                Ok(PollOutcome::Delivered {
                    delivered, failed, ..
                }) => {
                    report.delivered += delivered;
                    report.failed_deliveries += failed;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("poll {channel_id}/{account_id} failed: {e}");
                    report.errors += 1;
                }
            }
        }

        self.engine.prune_locks().await;

        info!(
            "sweep finished in {:?}: polled {}, delivered {}, delivery failures {}, errors {}",
            started.elapsed(),
            report.polled,
            report.delivered,
            report.failed_deliveries,
            report.errors
        );
        report
    }

    /// Sweep immediately, then every `interval`, until `shutdown` flips to true.
    ///
    /// A sweep in progress runs to completion; shutdown only prevents the next one.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("scheduler running, sweep interval {:?}", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if *shutdown.borrow() {
                        break;
                    }
                    self.sweep().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("scheduler stopped");
    }
}
