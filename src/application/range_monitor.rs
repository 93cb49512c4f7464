//! Range monitor: concurrent new-product checks over a PID range
//!
//! A sweep spawns one task per PID and gates them with a semaphore of
//! `max_concurrent` permits. Failures stay with their PID: they are logged
//! and counted in the [`SweepReport`], never returned from the sweep.
//! Cancelling the sweep closes the gate, so checks still waiting for a
//! permit are skipped while checks already running finish normally.

use crate::application::clock::Clock;
use crate::application::product_service::ProductService;
use crate::domain::pid_range;
use crate::infrastructure::config::MonitorConfig;
use crate::infrastructure::notifier::ProductNotifier;
use crate::infrastructure::product_cache::ProductCache;
use anyhow::{Context, Result};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

/// What a single check concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Already in the cache, nothing fetched
    Cached,
    /// No product, or no answer within the attempt budget
    NotFound,
    /// Fetched and cached, but older than the freshness window
    Known,
    /// Fetched, fresh, and announced
    NewProduct,
    /// The sweep was cancelled before the check started
    Skipped,
}

/// Counters of one sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub sweep_id: Uuid,
    pub total: usize,
    pub cached: usize,
    pub not_found: usize,
    pub known: usize,
    pub new_products: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub duration: Duration,
}

impl SweepReport {
    fn new(sweep_id: Uuid, total: usize) -> Self {
        Self {
            sweep_id,
            total,
            cached: 0,
            not_found: 0,
            known: 0,
            new_products: 0,
            failed: 0,
            skipped: 0,
            cancelled: false,
            duration: Duration::ZERO,
        }
    }

    /// Checks that ran to a conclusion
    pub fn checked(&self) -> usize {
        self.cached + self.not_found + self.known + self.new_products
    }

    fn record(&mut self, outcome: CheckOutcome) {
        match outcome {
            CheckOutcome::Cached => self.cached += 1,
            CheckOutcome::NotFound => self.not_found += 1,
            CheckOutcome::Known => self.known += 1,
            CheckOutcome::NewProduct => self.new_products += 1,
            CheckOutcome::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub max_concurrent: usize,
    /// Products created at most this many days ago are new
    pub delta_days: i64,
}

impl MonitorSettings {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent.max(1),
            delta_days: config.delta_days,
        }
    }
}

pub struct RangeMonitor {
    cache: Arc<dyn ProductCache>,
    products: Arc<ProductService>,
    notifier: Arc<dyn ProductNotifier>,
    clock: Arc<dyn Clock>,
    settings: MonitorSettings,
}

impl RangeMonitor {
    pub fn new(
        cache: Arc<dyn ProductCache>,
        products: Arc<ProductService>,
        notifier: Arc<dyn ProductNotifier>,
        clock: Arc<dyn Clock>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            cache,
            products,
            notifier,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> MonitorSettings {
        self.settings
    }

    /// Check one PID while holding a permit of `gate`.
    ///
    /// Unknown PIDs are fetched without consulting the cache again; a fresh
    /// result is announced through the notifier.
    pub async fn check_id(&self, pid: &str, gate: &Semaphore) -> Result<CheckOutcome> {
        let Ok(_permit) = gate.acquire().await else {
            return Ok(CheckOutcome::Skipped);
        };

        let cached = self
            .cache
            .select(pid, false)
            .await
            .with_context(|| format!("Failed to read cache for {pid}"))?;
        if cached.is_some() {
            return Ok(CheckOutcome::Cached);
        }

        let Some(record) = self.products.get_product(pid, false, false).await? else {
            return Ok(CheckOutcome::NotFound);
        };

        let today = self.clock.today();
        if !record.is_fresh(today, self.settings.delta_days) {
            debug!("{} is {} days old, not new", pid, record.age_in_days(today));
            return Ok(CheckOutcome::Known);
        }

        info!("🆕 New product {}: {} - {}", pid, record.brand(), record.name());
        self.notifier
            .notify_new_product(&record)
            .await
            .with_context(|| format!("Failed to announce {pid}"))?;
        Ok(CheckOutcome::NewProduct)
    }

    /// Check every PID from `start` to `end` inclusive
    pub async fn sweep(self: &Arc<Self>, start: u32, end: u32, cancel: &CancellationToken) -> SweepReport {
        let sweep_id = Uuid::new_v4();
        let span = info_span!("sweep", %sweep_id, start, end);
        self.sweep_inner(sweep_id, start, end, cancel).instrument(span).await
    }

    async fn sweep_inner(
        self: &Arc<Self>,
        sweep_id: Uuid,
        start: u32,
        end: u32,
        cancel: &CancellationToken,
    ) -> SweepReport {
        let started = Instant::now();
        let pids: Vec<String> = pid_range(start, end).collect();
        let mut report = SweepReport::new(sweep_id, pids.len());

        info!(
            "🚀 Sweeping {} ids ({} permits)",
            pids.len(),
            self.settings.max_concurrent
        );

        let gate = Arc::new(Semaphore::new(self.settings.max_concurrent));
        if cancel.is_cancelled() {
            gate.close();
        }
        let watcher = {
            let gate = Arc::clone(&gate);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                gate.close();
            })
        };

        let tasks: Vec<_> = pids
            .into_iter()
            .map(|pid| {
                let monitor = Arc::clone(self);
                let gate = Arc::clone(&gate);
                tokio::spawn(
                    async move {
                        let outcome = monitor.check_id(&pid, &gate).await;
                        (pid, outcome)
                    }
                    .in_current_span(),
                )
            })
            .collect();

        for joined in join_all(tasks).await {
            match joined {
                Ok((_, Ok(outcome))) => report.record(outcome),
                Ok((pid, Err(e))) => {
                    report.failed += 1;
                    warn!("⚠️ Check failed for {}: {:#}", pid, e);
                }
                Err(e) => {
                    report.failed += 1;
                    error!("❌ Check task panicked: {}", e);
                }
            }
        }

        watcher.abort();
        report.cancelled = cancel.is_cancelled();
        report.duration = started.elapsed();

        info!(
            "✅ Sweep finished in {:?}: {} checked, {} new, {} cached, {} not found, {} failed, {} skipped{}",
            report.duration,
            report.checked(),
            report.new_products,
            report.cached,
            report.not_found,
            report.failed,
            report.skipped,
            if report.cancelled { " (cancelled)" } else { "" }
        );
        report
    }
}
