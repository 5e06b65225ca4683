//! Scheduler (C9): two independent cron-driven jobs, singleton-guarded
//! against overlapping with themselves, stopped via the shared shutdown
//! coordinator.

use chrono::{Datelike, NaiveDate, Timelike, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::catalog::CatalogStore;
use crate::config::{RetentionConfig, SchedulerConfig};
use crate::connections::ConnectionRegistry;
use crate::error::EngineResult;
use crate::introspect::Introspector;
use crate::model::{PartitionType, TenantDescriptor, TimeInterval};
use crate::reconcile::{emitter::Emitter, Reconciler};
use crate::shard::{ShardExpander, TimeWindow};
use crate::shutdown::ShutdownCoordinator;

pub struct Scheduler {
    catalog: Arc<CatalogStore>,
    connections: Arc<ConnectionRegistry>,
    config: SchedulerConfig,
    retention: RetentionConfig,
    precreate_running: Arc<AtomicBool>,
    cleanup_running: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(
        catalog: Arc<CatalogStore>,
        connections: Arc<ConnectionRegistry>,
        config: SchedulerConfig,
        retention: RetentionConfig,
    ) -> Self {
        Self {
            catalog,
            connections,
            config,
            retention,
            precreate_running: Arc::new(AtomicBool::new(false)),
            cleanup_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn both jobs as independent ticker-driven tasks, stopped when the
    /// shutdown coordinator fires.
    pub fn spawn(self: Arc<Self>, shutdown: Arc<ShutdownCoordinator>) {
        let precreate = self.clone();
        let precreate_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut rx = precreate_shutdown.subscribe();
            let mut ticker = tokio::time::interval(precreate.config.tick_interval);
            let mut last_run_day: Option<NaiveDate> = None;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = Utc::now();
                        if now.hour() == precreate.config.shard_precreate_hour && last_run_day != Some(now.date_naive()) {
                            if let Err(e) = precreate.run_shard_precreation(&[]).await {
                                error!(error = %e, "shard pre-creation job failed");
                            }
                            last_run_day = Some(now.date_naive());
                        }
                    }
                    _ = rx.recv() => {
                        info!("shard pre-creation job stopping");
                        break;
                    }
                }
            }
        });

        let cleanup = self.clone();
        tokio::spawn(async move {
            let mut rx = shutdown.subscribe();
            let mut ticker = tokio::time::interval(cleanup.config.tick_interval);
            let mut last_run_day: Option<NaiveDate> = None;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = Utc::now();
                        if now.hour() == cleanup.config.retention_cleanup_hour && last_run_day != Some(now.date_naive()) {
                            if let Err(e) = cleanup.run_retention_cleanup(&[]).await {
                                error!(error = %e, "retention cleanup job failed");
                            }
                            last_run_day = Some(now.date_naive());
                        }
                    }
                    _ = rx.recv() => {
                        info!("retention cleanup job stopping");
                        break;
                    }
                }
            }
        });
    }

    /// Shard pre-creation: for every active time-sharded schema and every
    /// normal tenant, ensure the "current" and "next" physical tables exist.
    pub async fn run_shard_precreation(&self, tenants: &[TenantDescriptor]) -> EngineResult<usize> {
        if self.precreate_running.swap(true, Ordering::SeqCst) {
            warn!("shard pre-creation already running, skipping overlapping tick");
            return Ok(0);
        }
        let result = self.run_shard_precreation_inner(tenants).await;
        self.precreate_running.store(false, Ordering::SeqCst);
        result
    }

    async fn run_shard_precreation_inner(&self, tenants: &[TenantDescriptor]) -> EngineResult<usize> {
        let schemas = self.catalog.list_all_active().await?;
        let time_schemas: Vec<_> = schemas.into_iter().filter(|s| s.partition_type == PartitionType::Time).collect();

        let mut created = 0;
        for schema in &time_schemas {
            let interval = schema.time_interval.unwrap_or(TimeInterval::Day);
            let window = TimeWindow::default_for(interval, Utc::now().date_naive());

            for tenant in tenants.iter().filter(|t| t.is_active()) {
                let pool = self.connections.get_connection(tenant, schema.database_type).await?;
                let physical_names =
                    ShardExpander::expand(schema, &pool, tenant.store_directory.as_ref(), Some(window), None).await?;

                for physical_name in physical_names {
                    if !Introspector::exists(&pool, &physical_name).await? {
                        let target = schema.definition();
                        Reconciler::reconcile(&pool, &physical_name, &target).await?;
                        created += 1;
                    }
                }
            }
        }
        info!(created, "shard pre-creation tick complete");
        Ok(created)
    }

    /// Retention cleanup: for every active time-sharded `database_type =
    /// log` schema, drop physical shards older than the configured window.
    pub async fn run_retention_cleanup(&self, tenants: &[TenantDescriptor]) -> EngineResult<usize> {
        if self.cleanup_running.swap(true, Ordering::SeqCst) {
            warn!("retention cleanup already running, skipping overlapping tick");
            return Ok(0);
        }
        let result = self.run_retention_cleanup_inner(tenants).await;
        self.cleanup_running.store(false, Ordering::SeqCst);
        result
    }

    async fn run_retention_cleanup_inner(&self, tenants: &[TenantDescriptor]) -> EngineResult<usize> {
        use crate::model::DatabaseType;

        let schemas = self.catalog.list_all_active().await?;
        let log_time_schemas: Vec<_> = schemas
            .into_iter()
            .filter(|s| s.partition_type == PartitionType::Time && s.database_type == DatabaseType::Log)
            .collect();

        let mut dropped = 0;
        let today = Utc::now().date_naive();

        for schema in &log_time_schemas {
            let interval = schema.time_interval.unwrap_or(TimeInterval::Day);
            let format = schema.effective_time_format().unwrap_or(interval.default_format());
            let cutoff = retention_cutoff(interval, today, &self.retention);

            for tenant in tenants.iter().filter(|t| t.is_active()) {
                let pool = self.connections.get_connection(tenant, schema.database_type).await?;

                let pattern = format!("{}%", schema.table_name);
                let rows = sqlx::query("SHOW TABLES LIKE ?")
                    .bind(&pattern)
                    .fetch_all(&pool)
                    .await?;

                for row in rows {
                    let physical_name: String = sqlx::Row::try_get(&row, 0)?;
                    let Some(suffix) = physical_name.strip_prefix(&schema.table_name) else { continue };
                    let Some(shard_date) = parse_shard_date(suffix, format) else { continue };
                    if shard_date < cutoff {
                        sqlx::query(&Emitter::drop_table(&physical_name)).execute(&pool).await?;
                        dropped += 1;
                    }
                }
            }
        }
        info!(dropped, "retention cleanup tick complete");
        Ok(dropped)
    }
}

/// Exclusive cutoff: a shard exactly `N` periods old is still inside the
/// retention window (spec §8 scenario 4 keeps a 30-day-old shard under a
/// 30-day retention), so the boundary sits one period further back than a
/// plain `today - N` would put it.
fn retention_cutoff(interval: TimeInterval, today: NaiveDate, retention: &RetentionConfig) -> NaiveDate {
    match interval {
        TimeInterval::Day => today - chrono::Duration::days(retention.day_interval_days + 1),
        TimeInterval::Month => {
            let total_months =
                today.year() * 12 + (today.month() as i32 - 1) - (retention.month_interval_months as i32 + 1);
            let year = total_months.div_euclid(12);
            let month = (total_months.rem_euclid(12)) as u32 + 1;
            NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today)
        }
        TimeInterval::Year => {
            NaiveDate::from_ymd_opt(today.year() - (retention.year_interval_years as i32 + 1), 1, 1).unwrap_or(today)
        }
    }
}

/// Parse a shard-name suffix (e.g. `_20260101`, `_202601`, `_2026`) using the
/// format's token layout to recover a comparable date.
fn parse_shard_date(suffix: &str, format: &str) -> Option<NaiveDate> {
    let digits: String = suffix.chars().filter(|c| c.is_ascii_digit()).collect();

    if format.contains("DD") && digits.len() >= 8 {
        let year: i32 = digits[0..4].parse().ok()?;
        let month: u32 = digits[4..6].parse().ok()?;
        let day: u32 = digits[6..8].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    } else if format.contains("MM") && digits.len() >= 6 {
        let year: i32 = digits[0..4].parse().ok()?;
        let month: u32 = digits[4..6].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, 1)
    } else if digits.len() >= 4 {
        let year: i32 = digits[0..4].parse().ok()?;
        NaiveDate::from_ymd_opt(year, 1, 1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_shard_suffix() {
        assert_eq!(parse_shard_date("_20260115", "_YYYYMMDD"), NaiveDate::from_ymd_opt(2026, 1, 15));
    }

    #[test]
    fn parses_month_shard_suffix() {
        assert_eq!(parse_shard_date("_202603", "_YYYYMM"), NaiveDate::from_ymd_opt(2026, 3, 1));
    }

    #[test]
    fn retention_cutoff_keeps_the_nth_day_back_shard() {
        let retention = RetentionConfig { day_interval_days: 30, month_interval_months: 3, year_interval_years: 3 };
        let today = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        assert_eq!(retention_cutoff(TimeInterval::Day, today, &retention), today - chrono::Duration::days(31));
    }

    #[test]
    fn scenario_drop_set_matches_exactly_the_shard_older_than_the_window() {
        // 2025-06-01, day retention 30: shards at Jan 1, May 1, May 31, Jun 1.
        // Only Jan 1 should fall below the cutoff.
        let retention = RetentionConfig { day_interval_days: 30, month_interval_months: 3, year_interval_years: 3 };
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let cutoff = retention_cutoff(TimeInterval::Day, today, &retention);

        let jan1 = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let may1 = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let may31 = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
        let jun1 = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        assert!(jan1 < cutoff, "Jan 1 shard should be dropped");
        assert!(may1 >= cutoff, "May 1 shard should be retained");
        assert!(may31 >= cutoff, "May 31 shard should be retained");
        assert!(jun1 >= cutoff, "Jun 1 shard should be retained");
    }
}
