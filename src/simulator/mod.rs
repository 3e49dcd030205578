//! Synthetic latency generation
//!
//! `LatencyUpdater` assigns a fresh random latency to every connection on a
//! fixed interval and records it in the sample log.
//!
//! ```text
//! interval tick → list connections → per connection: draw → classify → record (tx)
//!                                                  ↓
//!                                      prune samples past retention
//! ```

pub mod seed;

#[cfg(test)]
mod tests;

pub use seed::{connection_for, generate_connections, seed_connections};

use crate::config::UpdaterConfig;
use crate::error::Result;
use crate::storage::Database;
use crate::types::Quality;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Source of simulated latency values (milliseconds)
pub trait LatencySource: Send {
    fn next_latency(&mut self) -> u32;
}

/// Uniform integer latency in `[0, upper)`
pub struct UniformLatency {
    upper: u32,
    rng: StdRng,
}

impl UniformLatency {
    pub fn new(upper: u32) -> Self {
        Self {
            upper: upper.max(1),
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(upper: u32, seed: u64) -> Self {
        Self {
            upper: upper.max(1),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl LatencySource for UniformLatency {
    fn next_latency(&mut self) -> u32 {
        self.rng.random_range(0..self.upper)
    }
}

/// Outcome of a single generator tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickReport {
    pub updated: usize,
    pub failed: usize,
    pub pruned: u64,
}

/// Updater state exposed on the health endpoint
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdaterStatus {
    pub running: bool,
    pub ticks: u64,
    pub consecutive_failures: u32,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_report: Option<TickReport>,
}

pub type SharedStatus = Arc<RwLock<UpdaterStatus>>;

impl UpdaterStatus {
    fn record_success(&mut self, report: TickReport) {
        self.ticks += 1;
        self.consecutive_failures = 0;
        self.last_tick_at = Some(Utc::now());
        self.last_report = Some(report);
    }

    fn record_failure(&mut self) {
        self.ticks += 1;
        self.consecutive_failures += 1;
        self.last_tick_at = Some(Utc::now());
    }
}

/// Oldest timestamp kept under `window`; `None` when the cutoff would fall
/// outside chrono's date range
pub fn retention_cutoff(now: DateTime<Utc>, window: chrono::Duration) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(window)
}

/// Periodic latency writer
pub struct LatencyUpdater<S: LatencySource> {
    db: Database,
    source: S,
    interval: Duration,
    retention: Option<chrono::Duration>,
    status: SharedStatus,
}

impl<S: LatencySource + 'static> LatencyUpdater<S> {
    pub fn new(db: Database, source: S, config: &UpdaterConfig) -> Self {
        Self {
            db,
            source,
            interval: config.interval(),
            retention: config.retention(),
            status: Arc::new(RwLock::new(UpdaterStatus::default())),
        }
    }

    /// Override the tick interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Handle to the status shared with readers
    pub fn status(&self) -> SharedStatus {
        self.status.clone()
    }

    /// Run one update pass over every connection.
    ///
    /// A failed write is logged and counted; the remaining connections are
    /// still updated. Only failing to list connections aborts the tick.
    pub async fn tick(&mut self) -> Result<TickReport> {
        let started = Instant::now();
        let connections = self.db.list_connections().await?;
        let mut report = TickReport::default();

        for conn in &connections {
            let latency = self.source.next_latency();
            let quality = Quality::from_tick_latency(latency);

            match self.db.record_latency(&conn.id, latency, quality, Utc::now()).await {
                Ok(_) => report.updated += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!("Failed to record latency for {}: {}", conn.id, e);
                }
            }
        }

        if let Some(window) = self.retention {
            match retention_cutoff(Utc::now(), window) {
                Some(cutoff) => match self.db.prune_samples_before(cutoff).await {
                    Ok(pruned) => report.pruned = pruned,
                    Err(e) => warn!("Failed to prune latency samples: {}", e),
                },
                None => warn!(
                    "Retention window of {}h reaches past the supported date range, skipping prune",
                    window.num_hours()
                ),
            }
        }

        debug!(
            "Latency tick: {} updated, {} failed, {} pruned in {:?}",
            report.updated,
            report.failed,
            report.pruned,
            started.elapsed()
        );

        Ok(report)
    }

    /// Start the updater on its own task.
    ///
    /// Ticks run inline, so they never overlap; ticks that come due while a
    /// pass is still running are skipped. Errors stay inside the task.
    pub fn spawn(mut self) -> UpdaterHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let status = self.status.clone();
        let interval = self.interval;

        status.write().running = true;
        info!("Latency updater started (interval {:?})", interval);

        let task_status = status.clone();
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }

                match self.tick().await {
                    Ok(report) => {
                        if report.failed > 0 {
                            warn!(
                                "Latency tick finished with {} failed writes out of {}",
                                report.failed,
                                report.updated + report.failed
                            );
                        }
                        task_status.write().record_success(report);
                    }
                    Err(e) => {
                        error!("Latency tick failed: {}", e);
                        task_status.write().record_failure();
                    }
                }
            }

            task_status.write().running = false;
            info!("Latency updater stopped");
        });

        UpdaterHandle {
            shutdown_tx,
            join,
            status,
        }
    }
}

/// Owner handle for a running updater
pub struct UpdaterHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
    status: SharedStatus,
}

impl UpdaterHandle {
    pub fn status(&self) -> SharedStatus {
        self.status.clone()
    }

    /// Signal shutdown and wait for the current tick to finish
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.join.await {
            error!("Latency updater task ended abnormally: {}", e);
            self.status.write().running = false;
        }
    }
}
