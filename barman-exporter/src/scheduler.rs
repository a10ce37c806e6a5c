//! Periodic collection loop.
//!
//! The scheduler runs one collection at startup, then waits for whichever
//! comes first: cancellation, a manual trigger or the polling interval. The
//! interval is measured from the end of the previous cycle. Cancellation is
//! only observed while waiting, so a running cycle always completes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::error::Result;
use crate::metrics::MetricsCollector;

/// Lifecycle of the collection loop, traced on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerState {
    Idle,
    Running,
    Waiting,
    Terminated,
}

/// What ended a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wake {
    Cancelled,
    Trigger,
    Interval,
}

/// Requests an immediate collection, e.g. on SIGUSR1.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    tx: mpsc::Sender<()>,
}

impl TriggerHandle {
    /// Ask for a collection. Requests arriving while one is already pending
    /// are merged into it.
    pub fn fire(&self) {
        if self.tx.try_send(()).is_err() {
            debug!("Collection already pending or scheduler stopped");
        }
    }
}

/// Create a linked trigger handle and receiver for [`Scheduler::new`].
pub fn trigger_channel() -> (TriggerHandle, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(1);
    (TriggerHandle { tx }, rx)
}

/// Drives [`MetricsCollector::collect`] until cancelled or until a cycle
/// fails as a whole.
pub struct Scheduler {
    collector: Arc<MetricsCollector>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    trigger: mpsc::Receiver<()>,
    cancel: CancellationToken,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(
        collector: Arc<MetricsCollector>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        trigger: mpsc::Receiver<()>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            collector,
            clock,
            interval,
            trigger,
            cancel,
            state: SchedulerState::Idle,
        }
    }

    /// Run the loop. Returns `Ok` on cancellation and the cycle's error if a
    /// collection fails as a whole.
    pub async fn run(mut self) -> Result<()> {
        info!(interval = ?self.interval, "Starting metrics loop");
        self.run_cycle(Wake::Interval).await?;

        loop {
            self.transition(SchedulerState::Waiting);

            let wake = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Wake::Cancelled,
                Some(()) = self.trigger.recv() => Wake::Trigger,
                _ = self.clock.sleep(self.interval) => Wake::Interval,
            };

            if wake == Wake::Cancelled {
                info!("Exiting metrics loop");
                self.transition(SchedulerState::Terminated);
                return Ok(());
            }

            self.run_cycle(wake).await?;
        }
    }

    async fn run_cycle(&mut self, wake: Wake) -> Result<()> {
        self.transition(SchedulerState::Running);
        if wake == Wake::Trigger {
            info!("Running metrics (manual trigger)");
        } else {
            debug!("Running metrics");
        }

        if let Err(e) = self.collector.collect().await {
            error!(error = %e, "Metrics collection failed, stopping metrics loop");
            self.transition(SchedulerState::Terminated);
            return Err(e);
        }
        Ok(())
    }

    fn transition(&mut self, next: SchedulerState) {
        debug!(from = ?self.state, to = ?next, "Scheduler state change");
        self.state = next;
    }
}
