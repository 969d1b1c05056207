// src/pipeline/metrics.rs
//
// Engine observability. Counts applied and ignored operations per
// subsystem. Export via logs or the report snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct EngineMetrics {
    pub events_processed: Arc<AtomicU64>,
    pub entries_recorded: Arc<AtomicU64>,
    pub entries_ignored: Arc<AtomicU64>,
    pub exits_recorded: Arc<AtomicU64>,
    pub exits_ignored: Arc<AtomicU64>,
    pub observations_recorded: Arc<AtomicU64>,
    pub metric_samples: Arc<AtomicU64>,
    pub ticks_run: Arc<AtomicU64>,
    pub alerts_triggered: Arc<AtomicU64>,
    pub alerts_updated: Arc<AtomicU64>,
    pub alerts_cleared: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            events_processed: Arc::new(AtomicU64::new(0)),
            entries_recorded: Arc::new(AtomicU64::new(0)),
            entries_ignored: Arc::new(AtomicU64::new(0)),
            exits_recorded: Arc::new(AtomicU64::new(0)),
            exits_ignored: Arc::new(AtomicU64::new(0)),
            observations_recorded: Arc::new(AtomicU64::new(0)),
            metric_samples: Arc::new(AtomicU64::new(0)),
            ticks_run: Arc::new(AtomicU64::new(0)),
            alerts_triggered: Arc::new(AtomicU64::new(0)),
            alerts_updated: Arc::new(AtomicU64::new(0)),
            alerts_cleared: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Event-processing rate since engine construction.
    pub fn events_per_second(&self) -> f64 {
        let events = self.events_processed.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            events as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> EngineMetricsSummary {
        EngineMetricsSummary {
            events_processed: self.events_processed.load(Ordering::Relaxed),
            entries_recorded: self.entries_recorded.load(Ordering::Relaxed),
            entries_ignored: self.entries_ignored.load(Ordering::Relaxed),
            exits_recorded: self.exits_recorded.load(Ordering::Relaxed),
            exits_ignored: self.exits_ignored.load(Ordering::Relaxed),
            observations_recorded: self.observations_recorded.load(Ordering::Relaxed),
            metric_samples: self.metric_samples.load(Ordering::Relaxed),
            ticks_run: self.ticks_run.load(Ordering::Relaxed),
            alerts_triggered: self.alerts_triggered.load(Ordering::Relaxed),
            alerts_updated: self.alerts_updated.load(Ordering::Relaxed),
            alerts_cleared: self.alerts_cleared.load(Ordering::Relaxed),
            events_per_second: self.events_per_second(),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct EngineMetricsSummary {
    pub events_processed: u64,
    pub entries_recorded: u64,
    pub entries_ignored: u64,
    pub exits_recorded: u64,
    pub exits_ignored: u64,
    pub observations_recorded: u64,
    pub metric_samples: u64,
    pub ticks_run: u64,
    pub alerts_triggered: u64,
    pub alerts_updated: u64,
    pub alerts_cleared: u64,
    pub events_per_second: f64,
    pub elapsed_secs: f64,
}
