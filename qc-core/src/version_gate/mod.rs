//! Version Gate (C10): memo of the last version a tenant's physical table
//! was reconciled to, so the orchestrator can skip already-applied versions.

use chrono::Utc;
use sqlx::{MySqlPool, Row};

use crate::error::EngineResult;
use crate::model::{DatabaseType, MigrationVersion, PartitionRule};
use crate::semver;

pub struct VersionGate {
    pool: MySqlPool,
}

impl VersionGate {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> EngineResult<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS qc_migration_versions (
                enterprise_id BIGINT NOT NULL,
                table_name VARCHAR(191) NOT NULL,
                database_type VARCHAR(16) NOT NULL,
                partition_rule VARCHAR(16) NOT NULL,
                current_migrated_version VARCHAR(32) NOT NULL,
                migration_time DATETIME(6) NOT NULL,
                PRIMARY KEY (enterprise_id, table_name, database_type, partition_rule)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// `true` if the tenant's memo for this key is already at or beyond
    /// `target_version`, meaning the orchestrator should skip it.
    pub async fn should_skip(
        &self,
        enterprise_id: i64,
        table_name: &str,
        database_type: DatabaseType,
        partition_rule: PartitionRule,
        target_version: &str,
    ) -> EngineResult<bool> {
        let memo = self.get(enterprise_id, table_name, database_type, partition_rule).await?;
        Ok(match memo {
            Some(memo) => !semver::is_greater(target_version, &memo.current_migrated_version),
            None => false,
        })
    }

    pub async fn get(
        &self,
        enterprise_id: i64,
        table_name: &str,
        database_type: DatabaseType,
        partition_rule: PartitionRule,
    ) -> EngineResult<Option<MigrationVersion>> {
        let row = sqlx::query(
            "SELECT enterprise_id, table_name, database_type, partition_rule, \
                    current_migrated_version, migration_time \
             FROM qc_migration_versions \
             WHERE enterprise_id = ? AND table_name = ? AND database_type = ? AND partition_rule = ?",
        )
        .bind(enterprise_id)
        .bind(table_name)
        .bind(database_type.as_str())
        .bind(partition_rule.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(MigrationVersion {
                enterprise_id: row.try_get("enterprise_id")?,
                table_name: row.try_get("table_name")?,
                database_type: row.try_get("database_type")?,
                partition_rule: row.try_get("partition_rule")?,
                current_migrated_version: row.try_get("current_migrated_version")?,
                migration_time: row.try_get("migration_time")?,
            })),
        }
    }

    /// Upsert the memo after a successful physical migration.
    pub async fn upsert(
        &self,
        enterprise_id: i64,
        table_name: &str,
        database_type: DatabaseType,
        partition_rule: PartitionRule,
        migrated_version: &str,
    ) -> EngineResult<()> {
        sqlx::query(
            "INSERT INTO qc_migration_versions \
             (enterprise_id, table_name, database_type, partition_rule, current_migrated_version, migration_time) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE current_migrated_version = VALUES(current_migrated_version), \
                                     migration_time = VALUES(migration_time)",
        )
        .bind(enterprise_id)
        .bind(table_name)
        .bind(database_type.as_str())
        .bind(partition_rule.as_str())
        .bind(migrated_version)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_rule_round_trips_through_as_str() {
        assert_eq!(PartitionRule::TimeMonth.as_str(), "time_month");
    }
}
