//! Fixed-delay scheduling of periodic sweeps.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default pause between two sweeps.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// A unit of periodic work.
#[async_trait]
pub trait Sweep: Send + Sync {
    /// Runs one cycle. Failures are handled inside the cycle.
    async fn sweep(&self);
}

/// Runs a sweep, waits `delay`, and repeats.
///
/// The delay is measured from the end of one cycle to the start of the
/// next, so cycles never overlap however long they take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay {
    pub delay: Duration,
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self {
            delay: DEFAULT_INTERVAL,
        }
    }
}

impl FixedDelay {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Drives `sweep` until `cancel` fires and returns the number of cycles
    /// run. A cycle in progress is always allowed to finish.
    pub async fn run<S>(&self, sweep: &S, cancel: CancellationToken) -> u64
    where
        S: Sweep + ?Sized,
    {
        info!(delay = ?self.delay, "Periodic sweep started");
        let mut cycles = 0;
        while !cancel.is_cancelled() {
            sweep.sweep().await;
            cycles += 1;

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.delay) => {}
            }
        }
        debug!(cycles, "Periodic sweep stopped");
        cycles
    }
}
