use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Process-wide counters for scans and merges
#[derive(Clone)]
pub struct Metrics {
    pub scans_started: Arc<AtomicUsize>,
    pub scans_completed: Arc<AtomicUsize>,
    pub models_created: Arc<AtomicU64>,
    pub models_removed: Arc<AtomicU64>,
    pub merges_completed: Arc<AtomicUsize>,
    pub merges_failed: Arc<AtomicUsize>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            scans_started: Arc::new(AtomicUsize::new(0)),
            scans_completed: Arc::new(AtomicUsize::new(0)),
            models_created: Arc::new(AtomicU64::new(0)),
            models_removed: Arc::new(AtomicU64::new(0)),
            merges_completed: Arc::new(AtomicUsize::new(0)),
            merges_failed: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_scans_started(&self) {
        self.scans_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_scans_completed(&self) {
        self.scans_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_models_created(&self, count: u64) {
        self.models_created.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_models_removed(&self, count: u64) {
        self.models_removed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_merges_completed(&self) {
        self.merges_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_merges_failed(&self) {
        self.merges_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            scans_started: self.scans_started.load(Ordering::Relaxed),
            scans_completed: self.scans_completed.load(Ordering::Relaxed),
            models_created: self.models_created.load(Ordering::Relaxed),
            models_removed: self.models_removed.load(Ordering::Relaxed),
            merges_completed: self.merges_completed.load(Ordering::Relaxed),
            merges_failed: self.merges_failed.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub scans_started: usize,
    pub scans_completed: usize,
    pub models_created: u64,
    pub models_removed: u64,
    pub merges_completed: usize,
    pub merges_failed: usize,
    pub uptime_seconds: u64,
}
