use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};

use crate::cycle::{CycleReport, CycleTask};
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub completed_runs: u64,
    pub failed_runs: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_report: Option<CycleReport>,
    pub average_run_time_ms: f64,
    pub started_at: DateTime<Utc>,
}

impl SchedulerStats {
    fn new() -> Self {
        Self {
            completed_runs: 0,
            failed_runs: 0,
            last_run: None,
            last_error: None,
            last_report: None,
            average_run_time_ms: 0.0,
            started_at: Utc::now(),
        }
    }

    pub fn total_runs(&self) -> u64 {
        self.completed_runs + self.failed_runs
    }

    pub fn uptime_seconds(&self) -> u64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
            .max(0) as u64
    }
}

/// Runs a cycle immediately and then once per interval until shutdown.
///
/// Cycles run inline on the scheduler's own task, so they can never overlap.
/// A shutdown signal interrupts the wait between cycles but lets a running
/// cycle finish.
pub struct CycleScheduler {
    task: Arc<dyn CycleTask>,
    interval: Duration,
    stats: Arc<RwLock<SchedulerStats>>,
}

impl CycleScheduler {
    pub fn new(task: Arc<dyn CycleTask>, interval: Duration) -> Self {
        Self {
            task,
            interval,
            stats: Arc::new(RwLock::new(SchedulerStats::new())),
        }
    }

    /// Loop until `shutdown` turns true or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Cycle scheduler started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let _ = self.run_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        let stats = self.get_stats().await;
        tracing::info!(
            completed_runs = stats.completed_runs,
            failed_runs = stats.failed_runs,
            uptime_secs = stats.uptime_seconds(),
            "Cycle scheduler stopped"
        );
    }

    /// Run one cycle and record its outcome. Errors are logged here, never
    /// propagated past the scheduler.
    pub async fn run_once(&self) -> Result<CycleReport> {
        let started = Instant::now();
        let result = self.task.run_cycle().await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let mut stats = self.stats.write().await;
        let previous_runs = stats.total_runs() as f64;
        stats.average_run_time_ms =
            (stats.average_run_time_ms * previous_runs + elapsed_ms) / (previous_runs + 1.0);
        stats.last_run = Some(Utc::now());

        match &result {
            Ok(report) => {
                stats.completed_runs += 1;
                stats.last_error = None;
                stats.last_report = Some(report.clone());
            }
            Err(e) => {
                tracing::error!(error = %e, "Cycle failed");
                stats.failed_runs += 1;
                stats.last_error = Some(e.to_string());
            }
        }

        result
    }

    pub async fn get_stats(&self) -> SchedulerStats {
        self.stats.read().await.clone()
    }
}
