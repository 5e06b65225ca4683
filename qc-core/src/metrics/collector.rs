//! Metrics collector implementation

use super::MetricsSnapshot;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for aggregating metrics data
#[derive(Debug)]
pub struct MetricsCollector {
    ddl_emitted: AtomicU64,
    ddl_failed: AtomicU64,
    batches_total: AtomicU64,
    lock_conflicts: AtomicU64,
    drift_proposals: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            ddl_emitted: AtomicU64::new(0),
            ddl_failed: AtomicU64::new(0),
            batches_total: AtomicU64::new(0),
            lock_conflicts: AtomicU64::new(0),
            drift_proposals: AtomicU64::new(0),
        }
    }

    /// Increment the emitted-DDL counter
    pub fn inc_ddl_emitted(&self) {
        self.ddl_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the failed-DDL counter
    pub fn inc_ddl_failed(&self) {
        self.ddl_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the orchestrator-batch counter
    pub fn inc_batches(&self) {
        self.batches_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the lock-conflict counter
    pub fn inc_lock_conflicts(&self) {
        self.lock_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the drift-proposal counter
    pub fn inc_drift_proposals(&self) {
        self.drift_proposals.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: std::time::SystemTime::now(),
            ddl_emitted: self.ddl_emitted.load(Ordering::Relaxed),
            ddl_failed: self.ddl_failed.load(Ordering::Relaxed),
            batches_total: self.batches_total.load(Ordering::Relaxed),
            lock_conflicts: self.lock_conflicts.load(Ordering::Relaxed),
            drift_proposals: self.drift_proposals.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
