//! Catalog Store (C2): the versioned source of truth for `TableSchema` rows,
//! backed by `qc_table_schemas` and `qc_migration_history` in the control DB.

use sqlx::{MySql, MySqlPool, Row, Transaction};

use crate::error::{EngineError, EngineResult};
use crate::model::{
    DatabaseType, ExecutionStatus, MigrationHistoryEntry, MigrationType, PartitionType,
    TableDefinitionDto, TableSchema,
};
use crate::semver;

/// CRUD surface over `qc_table_schemas` / `qc_migration_history`.
pub struct CatalogStore {
    pool: MySqlPool,
}

impl CatalogStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// `CREATE TABLE IF NOT EXISTS` for this store's own tables, run once at
    /// startup (spec §9: the control DB's own schema is not reconciled
    /// through C5, it is created by an existence check).
    pub async fn ensure_schema(&self) -> EngineResult<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS qc_table_schemas (
                id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
                table_name VARCHAR(191) NOT NULL,
                database_type VARCHAR(16) NOT NULL,
                partition_type VARCHAR(16) NOT NULL,
                time_interval VARCHAR(16) NULL,
                time_format VARCHAR(32) NULL,
                schema_version VARCHAR(32) NOT NULL,
                schema_definition JSON NOT NULL,
                is_active TINYINT(1) NOT NULL DEFAULT 1,
                upgrade_notes TEXT NULL,
                changes_detected TEXT NULL,
                created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
                KEY idx_key (table_name, database_type, partition_type, is_active)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS qc_migration_history (
                id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
                table_name VARCHAR(191) NOT NULL,
                database_type VARCHAR(16) NOT NULL,
                partition_type VARCHAR(16) NOT NULL,
                schema_version VARCHAR(32) NOT NULL,
                migration_type VARCHAR(16) NOT NULL,
                sql_statement TEXT NOT NULL,
                execution_status VARCHAR(16) NOT NULL,
                execution_time_ms BIGINT NOT NULL,
                error_message TEXT NULL,
                migration_batch_id CHAR(36) NOT NULL,
                created_at DATETIME(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
                KEY idx_table (table_name, database_type, partition_type),
                KEY idx_batch (migration_batch_id)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Enforces I1 (strictly-greater semver) and I2 (single active row per
    /// key), demoting the predecessor and inserting the new row in one
    /// transaction.
    pub async fn put_new_version(&self, schema: &TableSchema) -> EngineResult<i64> {
        schema
            .validate_time_fields()
            .map_err(EngineError::Validation)?;

        let mut tx = self.pool.begin().await?;

        let current = Self::load_active(&mut tx, &schema.table_name, schema.database_type, schema.partition_type).await?;

        if let Some(current) = &current {
            if !semver::is_greater(&schema.schema_version, &current.schema_version) {
                return Err(EngineError::Validation(format!(
                    "schema_version {} is not strictly greater than active version {}",
                    schema.schema_version, current.schema_version
                )));
            }
        }

        sqlx::query(
            "UPDATE qc_table_schemas SET is_active = 0 \
             WHERE table_name = ? AND database_type = ? AND partition_type = ? AND is_active = 1",
        )
        .bind(&schema.table_name)
        .bind(schema.database_type.as_str())
        .bind(schema.partition_type.as_str())
        .execute(&mut *tx)
        .await?;

        let definition_json = serde_json::to_value(&schema.schema_definition)
            .map_err(|e| EngineError::Validation(format!("schema_definition is not serializable: {}", e)))?;

        let result = sqlx::query(
            "INSERT INTO qc_table_schemas \
             (table_name, database_type, partition_type, time_interval, time_format, \
              schema_version, schema_definition, is_active, upgrade_notes, changes_detected) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(&schema.table_name)
        .bind(schema.database_type.as_str())
        .bind(schema.partition_type.as_str())
        .bind(schema.time_interval.map(|t| t.as_str()))
        .bind(&schema.time_format)
        .bind(&schema.schema_version)
        .bind(definition_json)
        .bind(&schema.upgrade_notes)
        .bind(&schema.changes_detected)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.last_insert_id() as i64)
    }

    pub async fn get_active(
        &self,
        table_name: &str,
        db_role: DatabaseType,
        partition_type: PartitionType,
    ) -> EngineResult<Option<TableSchema>> {
        let row = sqlx::query(
            "SELECT id, table_name, database_type, partition_type, time_interval, time_format, \
                    schema_version, schema_definition, is_active, upgrade_notes, changes_detected, created_at \
             FROM qc_table_schemas \
             WHERE table_name = ? AND database_type = ? AND partition_type = ? AND is_active = 1",
        )
        .bind(table_name)
        .bind(db_role.as_str())
        .bind(partition_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_schema).transpose()
    }

    /// Used when the caller omitted `partition_type`; if more than one
    /// distinct partition type is active under `(table_name, db_role)`, the
    /// caller must disambiguate.
    pub async fn find_active_matches(
        &self,
        table_name: &str,
        db_role: DatabaseType,
    ) -> EngineResult<Vec<TableSchema>> {
        let rows = sqlx::query(
            "SELECT id, table_name, database_type, partition_type, time_interval, time_format, \
                    schema_version, schema_definition, is_active, upgrade_notes, changes_detected, created_at \
             FROM qc_table_schemas \
             WHERE table_name = ? AND database_type = ? AND is_active = 1",
        )
        .bind(table_name)
        .bind(db_role.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_schema).collect()
    }

    /// Resolves a possibly-ambiguous `(table_name, db_role, partition_type?)`
    /// request, returning `DisambiguationRequired` when more than one
    /// partition type is active and none was specified.
    pub async fn resolve_active(
        &self,
        table_name: &str,
        db_role: DatabaseType,
        partition_type: Option<PartitionType>,
    ) -> EngineResult<TableSchema> {
        if let Some(partition_type) = partition_type {
            return self
                .get_active(table_name, db_role, partition_type)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("{}@{}@{}", table_name, db_role, partition_type)));
        }

        let matches = self.find_active_matches(table_name, db_role).await?;
        match matches.len() {
            0 => Err(EngineError::NotFound(format!("{}@{}", table_name, db_role))),
            1 => Ok(matches.into_iter().next().unwrap()),
            _ => {
                let candidates = matches.iter().map(|s| s.partition_type.to_string()).collect();
                Err(EngineError::DisambiguationRequired(candidates))
            }
        }
    }

    pub async fn list_all_active(&self) -> EngineResult<Vec<TableSchema>> {
        let rows = sqlx::query(
            "SELECT id, table_name, database_type, partition_type, time_interval, time_format, \
                    schema_version, schema_definition, is_active, upgrade_notes, changes_detected, created_at \
             FROM qc_table_schemas WHERE is_active = 1 ORDER BY table_name, database_type, partition_type",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_schema).collect()
    }

    pub async fn history(&self, table_name: &str, db_role: DatabaseType) -> EngineResult<Vec<TableSchema>> {
        let rows = sqlx::query(
            "SELECT id, table_name, database_type, partition_type, time_interval, time_format, \
                    schema_version, schema_definition, is_active, upgrade_notes, changes_detected, created_at \
             FROM qc_table_schemas WHERE table_name = ? AND database_type = ? ORDER BY id DESC",
        )
        .bind(table_name)
        .bind(db_role.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_schema).collect()
    }

    /// Soft delete: sets `is_active = false` without inserting a new
    /// version, distinct from supersession by `put_new_version`.
    pub async fn soft_delete(
        &self,
        table_name: &str,
        db_role: DatabaseType,
        partition_type: PartitionType,
    ) -> EngineResult<()> {
        let result = sqlx::query(
            "UPDATE qc_table_schemas SET is_active = 0 \
             WHERE table_name = ? AND database_type = ? AND partition_type = ? AND is_active = 1",
        )
        .bind(table_name)
        .bind(db_role.as_str())
        .bind(partition_type.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!("{}@{}@{}", table_name, db_role, partition_type)));
        }
        Ok(())
    }

    pub async fn record_history(&self, entry: &MigrationHistoryEntry) -> EngineResult<()> {
        sqlx::query(
            "INSERT INTO qc_migration_history \
             (table_name, database_type, partition_type, schema_version, migration_type, \
              sql_statement, execution_status, execution_time_ms, error_message, \
              migration_batch_id, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.table_name)
        .bind(entry.database_type.as_str())
        .bind(entry.partition_type.as_str())
        .bind(&entry.schema_version)
        .bind(migration_type_str(entry.migration_type))
        .bind(&entry.sql_statement)
        .bind(execution_status_str(entry.execution_status))
        .bind(entry.execution_time_ms)
        .bind(&entry.error_message)
        .bind(entry.migration_batch_id.to_string())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_active(
        tx: &mut Transaction<'_, MySql>,
        table_name: &str,
        db_role: DatabaseType,
        partition_type: PartitionType,
    ) -> EngineResult<Option<TableSchema>> {
        let row = sqlx::query(
            "SELECT id, table_name, database_type, partition_type, time_interval, time_format, \
                    schema_version, schema_definition, is_active, upgrade_notes, changes_detected, created_at \
             FROM qc_table_schemas \
             WHERE table_name = ? AND database_type = ? AND partition_type = ? AND is_active = 1 \
             FOR UPDATE",
        )
        .bind(table_name)
        .bind(db_role.as_str())
        .bind(partition_type.as_str())
        .fetch_optional(&mut **tx)
        .await?;

        row.map(Self::row_to_schema).transpose()
    }

    fn row_to_schema(row: sqlx::mysql::MySqlRow) -> EngineResult<TableSchema> {
        let database_type: String = row.try_get("database_type")?;
        let partition_type: String = row.try_get("partition_type")?;
        let time_interval: Option<String> = row.try_get("time_interval")?;
        let definition_json: serde_json::Value = row.try_get("schema_definition")?;

        Ok(TableSchema {
            id: row.try_get::<u64, _>("id")? as i64,
            table_name: row.try_get("table_name")?,
            database_type: DatabaseType::parse(&database_type)
                .ok_or_else(|| EngineError::CatalogConsistency(format!("bad database_type {}", database_type)))?,
            partition_type: PartitionType::parse(&partition_type)
                .ok_or_else(|| EngineError::CatalogConsistency(format!("bad partition_type {}", partition_type)))?,
            time_interval: time_interval.and_then(|t| crate::model::TimeInterval::parse(&t)),
            time_format: row.try_get("time_format")?,
            schema_version: row.try_get("schema_version")?,
            schema_definition: serde_json::from_value::<TableDefinitionDto>(definition_json)
                .map_err(|e| EngineError::CatalogConsistency(format!("bad schema_definition JSON: {}", e)))?,
            is_active: row.try_get::<i8, _>("is_active")? != 0,
            upgrade_notes: row.try_get("upgrade_notes")?,
            changes_detected: row.try_get("changes_detected")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn migration_type_str(t: MigrationType) -> &'static str {
    match t {
        MigrationType::Create => "CREATE",
        MigrationType::Alter => "ALTER",
        MigrationType::Drop => "DROP",
        MigrationType::Index => "INDEX",
    }
}

fn execution_status_str(s: ExecutionStatus) -> &'static str {
    match s {
        ExecutionStatus::Success => "success",
        ExecutionStatus::Failed => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_type_strings_are_uppercase() {
        assert_eq!(migration_type_str(MigrationType::Create), "CREATE");
        assert_eq!(migration_type_str(MigrationType::Index), "INDEX");
    }
}
