//! Fixed-interval sweep scheduler
//!
//! The checkpoint is the completion time of the last full sweep. It is
//! loaded when [`MonitorScheduler::run`] starts and written right after each
//! completed sweep, so the next sweep never starts less than `interval`
//! after the previous one ended, across restarts included.

use crate::application::clock::Clock;
use crate::application::range_monitor::RangeMonitor;
use crate::infrastructure::checkpoint_store::CheckpointStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Sweeping,
}

/// Time to wait before the next sweep.
///
/// No checkpoint means sweep now. A checkpoint in the future (clock moved
/// backwards) waits a full interval.
pub fn next_sweep_delay(
    checkpoint: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval: Duration,
) -> Duration {
    let Some(checkpoint) = checkpoint else {
        return Duration::ZERO;
    };

    match (now - checkpoint).to_std() {
        Ok(elapsed) => interval.saturating_sub(elapsed),
        Err(_) => interval,
    }
}

pub struct MonitorScheduler {
    monitor: Arc<RangeMonitor>,
    checkpoints: Arc<dyn CheckpointStore>,
    clock: Arc<dyn Clock>,
    start: u32,
    end: u32,
    interval: Duration,
    state: watch::Sender<SchedulerState>,
}

impl MonitorScheduler {
    pub fn new(
        monitor: Arc<RangeMonitor>,
        checkpoints: Arc<dyn CheckpointStore>,
        clock: Arc<dyn Clock>,
        (start, end): (u32, u32),
        interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            monitor,
            checkpoints,
            clock,
            start,
            end,
            interval,
            state,
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// Sweep forever until `cancel` fires.
    ///
    /// Returns an error only when the checkpoint cannot be loaded or saved.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut checkpoint = self
            .checkpoints
            .load()
            .await
            .context("Failed to load sweep checkpoint")?;

        match checkpoint {
            Some(at) => info!("📌 Last sweep completed at {}", at),
            None => info!("📌 No previous sweep recorded"),
        }

        loop {
            let delay = next_sweep_delay(checkpoint, self.clock.now(), self.interval);
            if !delay.is_zero() {
                info!("⏳ Next sweep in {}s", delay.as_secs());
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("🛑 Scheduler stopped while idle");
                    return Ok(());
                }
                () = tokio::time::sleep(delay) => {}
            }

            self.state.send_replace(SchedulerState::Sweeping);
            let report = self.monitor.sweep(self.start, self.end, &cancel).await;
            self.state.send_replace(SchedulerState::Idle);

            if report.cancelled {
                info!("🛑 Sweep {} cancelled, checkpoint unchanged", report.sweep_id);
                return Ok(());
            }

            let completed_at = self.clock.now();
            self.checkpoints
                .save(completed_at)
                .await
                .context("Failed to persist sweep checkpoint")?;
            checkpoint = Some(completed_at);
        }
    }
}
