//! Metrics collection and export for observability

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

mod collector;
mod exporter;

pub use collector::MetricsCollector;
pub use exporter::{MetricsExporter, PrometheusExporter};

/// Initialize metrics with descriptions
pub fn init_metrics() {
    describe_counter!("migrations.ddl.emitted", "Number of DDL statements emitted by reconcile");
    describe_counter!("migrations.ddl.failed", "Number of DDL statements that failed");
    describe_counter!("migrations.batches.total", "Total orchestrator operations executed");
    describe_histogram!("migrations.reconcile.duration_ms", "Duration of a single table reconcile");
    describe_gauge!("migrations.tables.reconciled", "Physical tables reconciled in the last batch");

    describe_counter!("locks.acquired", "Number of successful lock acquisitions");
    describe_counter!("locks.conflicts", "Number of lock acquisition conflicts");
    describe_counter!("locks.cleaned", "Number of stale locks force-cleaned");

    describe_counter!("drift.proposals.new_table", "New-table proposals emitted by the drift detector");
    describe_counter!("drift.proposals.altered", "Altered-definition proposals emitted by the drift detector");
    describe_counter!("drift.proposals.drop", "Drop-table proposals emitted by the drift detector");

    describe_gauge!("connections.pools.active", "Number of cached (tenant, role) connection pools");
    describe_counter!("scheduler.ticks", "Scheduler ticker invocations");
    describe_gauge!("system.uptime_seconds", "Process uptime in seconds");
}

/// Record a counter metric
pub fn record_counter(name: &'static str, value: u64) {
    counter!(name).increment(value);
}

/// Record a gauge metric
pub fn record_gauge(name: &'static str, value: f64) {
    gauge!(name).set(value);
}

/// Record a histogram metric
pub fn record_histogram(name: &'static str, value: f64) {
    histogram!(name).record(value);
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    /// Create a new timer
    pub fn new(name: &'static str) -> Self {
        Self { name, start: Instant::now() }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) {
        let duration = self.start.elapsed();
        histogram!(self.name).record(duration.as_secs_f64() * 1000.0);
    }
}

/// Metrics snapshot for reporting
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub timestamp: std::time::SystemTime,
    pub ddl_emitted: u64,
    pub ddl_failed: u64,
    pub batches_total: u64,
    pub lock_conflicts: u64,
    pub drift_proposals: u64,
}

/// Metrics service for background collection
pub struct MetricsService {
    collector: Arc<RwLock<MetricsCollector>>,
    collection_interval: Duration,
}

impl MetricsService {
    /// Create a new metrics service
    pub fn new(collection_interval: Duration) -> Self {
        Self { collector: Arc::new(RwLock::new(MetricsCollector::new())), collection_interval }
    }

    /// Start the metrics collection service
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.collection_interval);
        loop {
            interval.tick().await;
            self.collect_system_metrics().await;
        }
    }

    async fn collect_system_metrics(&self) {
        gauge!("system.uptime_seconds").set(0.0);
    }

    /// Get current metrics snapshot
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let collector = self.collector.read().await;
        collector.snapshot()
    }

    /// Access the underlying collector for direct increments.
    pub fn collector(&self) -> Arc<RwLock<MetricsCollector>> {
        self.collector.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_init() {
        init_metrics();
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new("migrations.reconcile.duration_ms");
        std::thread::sleep(std::time::Duration::from_millis(5));
        timer.stop();
    }

    #[tokio::test]
    async fn test_metrics_service() {
        let service = Arc::new(MetricsService::new(Duration::from_millis(100)));
        let snapshot = service.snapshot().await;
        assert!(snapshot.timestamp <= std::time::SystemTime::now());
    }
}
