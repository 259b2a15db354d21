//! Eviction Sweep Task
//!
//! Background task that periodically asks the eviction engine to drop
//! expired entries and entries over capacity.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::EvictionEngine;

/// Handle to a running sweep task.
///
/// The task lives as long as the handle: `stop` or dropping the handle
/// cancels it.
#[derive(Debug)]
pub struct SweepTask {
    handle: JoinHandle<()>,
}

impl SweepTask {
    /// Cancels the periodic sweep.
    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SweepTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawns a task that sweeps `engine` every `period`.
///
/// The first sweep runs one period after the call. A sweep that overruns
/// pushes the following ones back rather than bunching them up.
///
/// # Example
/// ```ignore
/// let task = spawn_sweep_task(engine.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// task.stop();
/// ```
pub fn spawn_sweep_task(engine: Arc<EvictionEngine>, period: Duration) -> SweepTask {
    let period = period.max(Duration::from_millis(1));

    let handle = tokio::spawn(async move {
        info!(period_ms = period.as_millis() as u64, "Starting eviction sweep task");

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let report = engine.sweep();
            if report.is_empty() {
                debug!(entries = engine.len(), "Eviction sweep: nothing to remove");
            } else {
                info!(
                    evicted = report.evicted,
                    expired = report.expired,
                    entries = engine.len(),
                    "Eviction sweep removed entries"
                );
            }
        }
    });

    SweepTask { handle }
}
