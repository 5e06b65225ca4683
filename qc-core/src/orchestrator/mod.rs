//! Orchestrator (C8): the three public entry points that tie the Catalog
//! Store, Lock Manager, Connection Registry, Shard Expander, Version Gate,
//! and Reconciliation Engine together into end-to-end migrations.

use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::catalog::CatalogStore;
use crate::connections::ConnectionRegistry;
use crate::error::{EngineError, EngineResult};
use crate::locks::{AcquireOutcome, LockManager};
use crate::model::{
    DatabaseType, LockKey, LockType, MigrationHistoryEntry, PartitionRule, PartitionType, TenantDescriptor,
};
use crate::reconcile::{DdlOutcome, Reconciler};
use crate::shard::ShardExpander;
use crate::version_gate::VersionGate;

/// One entry in a batch's aggregated failure list: table, batch, statement,
/// error (spec §4.8 response summary).
#[derive(Debug, Clone)]
pub struct FailedStatement {
    pub physical_name: String,
    pub migration_batch_id: Uuid,
    pub sql: String,
    pub error: String,
}

/// Per-schema outcome inside a sweep, plus the overall batch's aggregated
/// failures.
#[derive(Debug, Clone)]
pub struct MigrationSummary {
    pub migration_batch_id: Uuid,
    pub tables_reconciled: usize,
    pub ddls_succeeded: usize,
    pub ddls_failed: usize,
    pub failed_statements: Vec<FailedStatement>,
}

impl MigrationSummary {
    fn new(migration_batch_id: Uuid) -> Self {
        Self {
            migration_batch_id,
            tables_reconciled: 0,
            ddls_succeeded: 0,
            ddls_failed: 0,
            failed_statements: Vec::new(),
        }
    }

    fn absorb(&mut self, physical_name: &str, outcomes: &[DdlOutcome]) {
        self.tables_reconciled += 1;
        for outcome in outcomes {
            if outcome.succeeded {
                self.ddls_succeeded += 1;
            } else {
                self.ddls_failed += 1;
                self.failed_statements.push(FailedStatement {
                    physical_name: physical_name.to_string(),
                    migration_batch_id: self.migration_batch_id,
                    sql: outcome.sql.clone(),
                    error: outcome.error.clone().unwrap_or_default(),
                });
            }
        }
    }
}

pub struct Orchestrator {
    catalog: Arc<CatalogStore>,
    locks: Arc<LockManager>,
    connections: Arc<ConnectionRegistry>,
    version_gate: Arc<VersionGate>,
}

impl Orchestrator {
    pub fn new(
        catalog: Arc<CatalogStore>,
        locks: Arc<LockManager>,
        connections: Arc<ConnectionRegistry>,
        version_gate: Arc<VersionGate>,
    ) -> Self {
        Self { catalog, locks, connections, version_gate }
    }

    /// Accessors so callers (e.g. the control-plane API) can share this
    /// orchestrator's components instead of standing up separate ones.
    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    pub fn locks(&self) -> &Arc<LockManager> {
        &self.locks
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    pub fn version_gate(&self) -> &Arc<VersionGate> {
        &self.version_gate
    }

    /// `migrateTable(name, db_role, partition_type, version?)`.
    pub async fn migrate_table(
        &self,
        table_name: &str,
        db_role: DatabaseType,
        partition_type: Option<PartitionType>,
        version: Option<&str>,
        tenants: &[TenantDescriptor],
    ) -> EngineResult<MigrationSummary> {
        let schema = self.catalog.resolve_active(table_name, db_role, partition_type).await?;

        if let Some(requested) = version {
            if requested != schema.schema_version {
                return Err(EngineError::NotFound(format!(
                    "{}@{}@{} at version {} is not active (active is {})",
                    table_name, db_role, schema.partition_type, requested, schema.schema_version
                )));
            }
        }

        let key = LockKey { table_name: table_name.to_string(), database_type: db_role, partition_type: schema.partition_type };
        let lock = self.acquire_single_table(key).await?;

        let batch_id = Uuid::new_v4();
        let mut summary = MigrationSummary::new(batch_id);

        let result = async {
            for tenant in tenants.iter().filter(|t| t.is_active()) {
                self.migrate_schema_for_tenant(tenant, &schema, batch_id, &mut summary, None).await?;
            }
            Ok::<(), EngineError>(())
        }
        .await;

        self.locks.release(&lock.lock_key, &lock.lock_holder).await?;
        result?;
        Ok(summary)
    }

    /// `migrateAllTables()` — per-schema failures are collected, not fatal.
    pub async fn migrate_all_tables(&self, tenants: &[TenantDescriptor]) -> EngineResult<MigrationSummary> {
        let lock = self.acquire_all_tables().await?;

        let batch_id = Uuid::new_v4();
        let mut summary = MigrationSummary::new(batch_id);

        let mut schemas = self.catalog.list_all_active().await?;
        // Deterministic order: database_type ASC, table_name ASC, schema_version DESC.
        schemas.sort_by(|a, b| {
            a.database_type
                .as_str()
                .cmp(b.database_type.as_str())
                .then(a.table_name.cmp(&b.table_name))
                .then(crate::semver::compare(&b.schema_version, &a.schema_version))
        });

        for schema in &schemas {
            for tenant in tenants.iter().filter(|t| t.is_active()) {
                if let Err(e) = self.migrate_schema_for_tenant(tenant, schema, batch_id, &mut summary, None).await {
                    error!(table = %schema.table_name, error = %e, "schema migration failed, continuing sweep");
                }
            }
        }

        self.locks.release(&lock.lock_key, &lock.lock_holder).await?;
        Ok(summary)
    }

    /// `migrateStoreShards(store_id, tenant_id)` — reconciles only the
    /// `<table>_<store_id>` physical name for that tenant, across every
    /// active schema with `partition_type = store`.
    pub async fn migrate_store_shards(
        &self,
        store_id: &str,
        tenant: &TenantDescriptor,
    ) -> EngineResult<MigrationSummary> {
        let key = LockKey {
            table_name: format!("store:{}", store_id),
            database_type: DatabaseType::Main,
            partition_type: PartitionType::Store,
        };
        let lock = self.acquire_single_table(key).await?;

        let batch_id = Uuid::new_v4();
        let mut summary = MigrationSummary::new(batch_id);

        let result = async {
            let schemas = self.catalog.list_all_active().await?;
            for schema in schemas.iter().filter(|s| s.partition_type == PartitionType::Store) {
                self.migrate_schema_for_tenant(tenant, schema, batch_id, &mut summary, Some(store_id)).await?;
            }
            Ok::<(), EngineError>(())
        }
        .await;

        self.locks.release(&lock.lock_key, &lock.lock_holder).await?;
        result?;
        Ok(summary)
    }

    async fn migrate_schema_for_tenant(
        &self,
        tenant: &TenantDescriptor,
        schema: &crate::model::TableSchema,
        batch_id: Uuid,
        summary: &mut MigrationSummary,
        explicit_store_id: Option<&str>,
    ) -> EngineResult<()> {
        let partition_rule = PartitionRule::from_schema(schema.partition_type, schema.time_interval);

        if self
            .version_gate
            .should_skip(tenant.id, &schema.table_name, schema.database_type, partition_rule, &schema.schema_version)
            .await
            .unwrap_or(false)
        {
            info!(table = %schema.table_name, tenant = tenant.id, "skipping, already at target version");
            return Ok(());
        }

        let pool = self.connections.get_connection(tenant, schema.database_type).await?;

        let physical_names = ShardExpander::expand(
            schema,
            &pool,
            tenant.store_directory.as_ref(),
            None,
            explicit_store_id,
        )
        .await?;

        for physical_name in physical_names {
            let target = schema.definition();
            let report = Reconciler::reconcile(&pool, &physical_name, &target).await?;

            for outcome in &report.outcomes {
                let entry = if outcome.succeeded {
                    MigrationHistoryEntry::success(
                        physical_name.clone(),
                        schema.database_type,
                        schema.partition_type,
                        schema.schema_version.clone(),
                        outcome.migration_type,
                        outcome.sql.clone(),
                        outcome.duration_ms,
                        batch_id,
                    )
                } else {
                    MigrationHistoryEntry::failed(
                        physical_name.clone(),
                        schema.database_type,
                        schema.partition_type,
                        schema.schema_version.clone(),
                        outcome.migration_type,
                        outcome.sql.clone(),
                        outcome.duration_ms,
                        batch_id,
                        outcome.error.clone().unwrap_or_default(),
                    )
                };
                if let Err(e) = self.catalog.record_history(&entry).await {
                    error!(physical_name = %physical_name, error = %e, "failed to record migration history");
                }
            }

            summary.absorb(&physical_name, &report.outcomes);
        }

        if let Err(e) = self
            .version_gate
            .upsert(tenant.id, &schema.table_name, schema.database_type, partition_rule, &schema.schema_version)
            .await
        {
            error!(table = %schema.table_name, tenant = tenant.id, error = %e, "version gate upsert failed, non-fatal");
        }

        Ok(())
    }

    async fn acquire_single_table(&self, key: LockKey) -> EngineResult<crate::model::MigrationLock> {
        match self.locks.acquire(LockType::SingleTable, Some(key)).await? {
            AcquireOutcome::Acquired(lock) => Ok(lock),
            AcquireOutcome::Conflict(existing) => Err(EngineError::LockConflict(Box::new(existing))),
        }
    }

    async fn acquire_all_tables(&self) -> EngineResult<crate::model::MigrationLock> {
        match self.locks.acquire(LockType::AllTables, None).await? {
            AcquireOutcome::Acquired(lock) => Ok(lock),
            AcquireOutcome::Conflict(existing) => Err(EngineError::LockConflict(Box::new(existing))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_absorbs_mixed_outcomes() {
        let mut summary = MigrationSummary::new(Uuid::new_v4());
        let outcomes = vec![
            DdlOutcome {
                migration_type: crate::model::MigrationType::Alter,
                sql: "ALTER TABLE x ADD COLUMN y INT".to_string(),
                succeeded: true,
                error: None,
                duration_ms: 5,
            },
            DdlOutcome {
                migration_type: crate::model::MigrationType::Alter,
                sql: "ALTER TABLE x MODIFY COLUMN z INT".to_string(),
                succeeded: false,
                error: Some("boom".to_string()),
                duration_ms: 3,
            },
        ];
        summary.absorb("x", &outcomes);
        assert_eq!(summary.tables_reconciled, 1);
        assert_eq!(summary.ddls_succeeded, 1);
        assert_eq!(summary.ddls_failed, 1);
        assert_eq!(summary.failed_statements.len(), 1);
    }
}
