use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DatabaseType, ExecutionStatus, MigrationType, PartitionType};

/// One append-only record of a single physical DDL statement (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationHistoryEntry {
    pub table_name: String,
    pub database_type: DatabaseType,
    pub partition_type: PartitionType,
    pub schema_version: String,
    pub migration_type: MigrationType,
    pub sql_statement: String,
    pub execution_status: ExecutionStatus,
    pub execution_time_ms: i64,
    pub error_message: Option<String>,
    pub migration_batch_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl MigrationHistoryEntry {
    pub fn success(
        table_name: impl Into<String>,
        database_type: DatabaseType,
        partition_type: PartitionType,
        schema_version: impl Into<String>,
        migration_type: MigrationType,
        sql_statement: impl Into<String>,
        execution_time_ms: i64,
        migration_batch_id: Uuid,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            database_type,
            partition_type,
            schema_version: schema_version.into(),
            migration_type,
            sql_statement: sql_statement.into(),
            execution_status: ExecutionStatus::Success,
            execution_time_ms,
            error_message: None,
            migration_batch_id,
            created_at: Utc::now(),
        }
    }

    pub fn failed(
        table_name: impl Into<String>,
        database_type: DatabaseType,
        partition_type: PartitionType,
        schema_version: impl Into<String>,
        migration_type: MigrationType,
        sql_statement: impl Into<String>,
        execution_time_ms: i64,
        migration_batch_id: Uuid,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            database_type,
            partition_type,
            schema_version: schema_version.into(),
            migration_type,
            sql_statement: sql_statement.into(),
            execution_status: ExecutionStatus::Failed,
            execution_time_ms,
            error_message: Some(error_message.into()),
            migration_batch_id,
            created_at: Utc::now(),
        }
    }
}
