//! Reconciliation Engine (C5): drives one physical table toward a target
//! `TableDefinition` via create, or four ordered diff phases.

pub mod diff;
pub mod emitter;

use sqlx::MySqlPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::introspect::Introspector;
use crate::model::{DatabaseType, MigrationType, PartitionType, TableDefinition};
use emitter::Emitter;

/// Outcome of a single DDL statement attempted during a reconcile.
#[derive(Debug, Clone)]
pub struct DdlOutcome {
    pub migration_type: MigrationType,
    pub sql: String,
    pub succeeded: bool,
    pub error: Option<String>,
    pub duration_ms: i64,
}

/// The set of DDL statements attempted for one physical table in one call
/// to [`Reconciler::reconcile`]. Per-DDL failures are recorded here rather
/// than aborting, per spec §4.5.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub physical_name: String,
    pub outcomes: Vec<DdlOutcome>,
}

impl ReconcileReport {
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded).count()
    }
}

pub struct Reconciler;

impl Reconciler {
    /// `reconcile(connection, physical_name, target)` — spec §4.5.
    pub async fn reconcile(
        pool: &MySqlPool,
        physical_name: &str,
        target: &TableDefinition,
    ) -> EngineResult<ReconcileReport> {
        let mut report = ReconcileReport { physical_name: physical_name.to_string(), outcomes: Vec::new() };

        if target.is_drop() {
            let sql = Emitter::drop_table(physical_name);
            report.outcomes.push(Self::execute(pool, MigrationType::Drop, sql).await);
            return Ok(report);
        }

        let exists = Introspector::exists(pool, physical_name).await?;

        if !exists {
            if let Some(sql) = Emitter::create_table(target) {
                report.outcomes.push(Self::execute(pool, MigrationType::Create, sql).await);
            }
            return Ok(report);
        }

        let (columns, indexes) = match target {
            TableDefinition::Columns { columns, indexes, .. } => (columns, indexes),
            TableDefinition::Drop { .. } => unreachable!(),
        };

        let live_columns = Introspector::columns(pool, physical_name).await?;
        let live_indexes = Introspector::indexes(pool, physical_name).await?;

        // Phase A: drop removed columns.
        for live_col in diff::phase_a_drop_columns(&live_columns, columns) {
            let sql = Emitter::drop_column(physical_name, &live_col.name);
            report.outcomes.push(Self::execute_lenient(pool, MigrationType::Drop, sql).await);
        }

        // Phase B: add new columns. A duplicate-column error counts as success.
        for target_col in diff::phase_b_add_columns(&live_columns, columns) {
            let sql = Emitter::add_column(physical_name, target_col);
            let mut outcome = Self::execute_lenient(pool, MigrationType::Alter, sql).await;
            if !outcome.succeeded && is_duplicate_column_error(outcome.error.as_deref()) {
                outcome.succeeded = true;
            }
            report.outcomes.push(outcome);
        }

        // Phase C: modify changed columns.
        for target_col in diff::phase_c_modify_columns(&live_columns, columns) {
            let sql = Emitter::modify_column(physical_name, target_col);
            report.outcomes.push(Self::execute_lenient(pool, MigrationType::Alter, sql).await);
        }

        // Phase D: synchronize indexes.
        let index_diff = diff::phase_d_sync_indexes(&live_indexes, columns, indexes);
        for live_index in index_diff.to_drop {
            let sql = Emitter::drop_index(physical_name, &live_index.name);
            report.outcomes.push(Self::execute_lenient(pool, MigrationType::Index, sql).await);
        }
        for target_index in index_diff.to_create {
            let sql = Emitter::create_index(physical_name, target_index);
            let mut outcome = Self::execute_lenient(pool, MigrationType::Index, sql).await;
            if !outcome.succeeded && is_duplicate_index_error(outcome.error.as_deref()) {
                outcome.succeeded = true;
            }
            report.outcomes.push(outcome);
        }

        Ok(report)
    }

    /// Execute a single DDL statement, surfacing failure as `Err` — used
    /// only for the create/drop-table fast paths where the spec does not
    /// ask for per-statement leniency beyond the batch report.
    async fn execute(pool: &MySqlPool, migration_type: MigrationType, sql: String) -> DdlOutcome {
        Self::execute_lenient(pool, migration_type, sql).await
    }

    /// Execute one statement, collecting failure into the outcome instead of
    /// propagating — failures here are non-fatal per spec §4.5 unless the
    /// caller specifically treats the `exists`/`columns`/`indexes` reads
    /// (not this function) as catastrophic.
    async fn execute_lenient(pool: &MySqlPool, migration_type: MigrationType, sql: String) -> DdlOutcome {
        let start = std::time::Instant::now();
        let result = sqlx::query(&sql).execute(pool).await;
        let duration_ms = start.elapsed().as_millis() as i64;

        match result {
            Ok(_) => {
                info!(sql = %sql, "ddl executed");
                crate::metrics::record_counter("migrations.ddl.emitted", 1);
                DdlOutcome { migration_type, sql, succeeded: true, error: None, duration_ms }
            }
            Err(e) => {
                warn!(sql = %sql, error = %e, "ddl failed, continuing reconcile");
                crate::metrics::record_counter("migrations.ddl.failed", 1);
                DdlOutcome { migration_type, sql, succeeded: false, error: Some(e.to_string()), duration_ms }
            }
        }
    }
}

fn is_duplicate_column_error(message: Option<&str>) -> bool {
    message.map(|m| m.to_ascii_lowercase().contains("duplicate column")).unwrap_or(false)
}

fn is_duplicate_index_error(message: Option<&str>) -> bool {
    message
        .map(|m| {
            let lower = m.to_ascii_lowercase();
            lower.contains("duplicate key name") || lower.contains("duplicate index")
        })
        .unwrap_or(false)
}

/// Context a reconcile runs under, threaded through by the Orchestrator
/// (C8) for history recording: which tenant/table/version this batch
/// belongs to.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    pub table_name: String,
    pub database_type: DatabaseType,
    pub partition_type: PartitionType,
    pub schema_version: String,
    pub migration_batch_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_duplicate_column_error() {
        assert!(is_duplicate_column_error(Some("Error: Duplicate column name 'phone'")));
        assert!(!is_duplicate_column_error(Some("Unknown column 'x'")));
    }

    #[test]
    fn recognizes_duplicate_index_error() {
        assert!(is_duplicate_index_error(Some("Duplicate key name 'idx_email'")));
    }
}
