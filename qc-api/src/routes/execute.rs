//! `execute*` — the three Orchestrator entry points (spec §4.8, §4.11).

use axum::extract::State;
use axum::Json;
use qc_core::orchestrator::MigrationSummary;
use serde::{Deserialize, Serialize};

use super::schemas::{parse_database_type, parse_partition_type};
use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub migration_batch_id: uuid::Uuid,
    pub tables_reconciled: usize,
    pub ddls_succeeded: usize,
    pub ddls_failed: usize,
    pub failed_statements: Vec<FailedStatementDto>,
}

#[derive(Debug, Serialize)]
pub struct FailedStatementDto {
    pub physical_name: String,
    pub sql: String,
    pub error: String,
}

impl From<MigrationSummary> for ExecuteResponse {
    fn from(s: MigrationSummary) -> Self {
        Self {
            migration_batch_id: s.migration_batch_id,
            tables_reconciled: s.tables_reconciled,
            ddls_succeeded: s.ddls_succeeded,
            ddls_failed: s.ddls_failed,
            failed_statements: s
                .failed_statements
                .into_iter()
                .map(|f| FailedStatementDto { physical_name: f.physical_name, sql: f.sql, error: f.error })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub table_name: String,
    pub database_type: String,
    pub partition_type: Option<String>,
    pub version: Option<String>,
}

pub async fn execute(
    State(state): State<SharedState>,
    Json(body): Json<ExecuteRequest>,
) -> ApiResult<Json<ExecuteResponse>> {
    let database_type = parse_database_type(&body.database_type)?;
    let partition_type = body.partition_type.as_deref().map(parse_partition_type).transpose()?;

    let summary = state
        .orchestrator
        .migrate_table(&body.table_name, database_type, partition_type, body.version.as_deref(), &state.tenants)
        .await?;

    Ok(Json(summary.into()))
}

pub async fn execute_all(State(state): State<SharedState>) -> ApiResult<Json<ExecuteResponse>> {
    let summary = state.orchestrator.migrate_all_tables(&state.tenants).await?;
    Ok(Json(summary.into()))
}

#[derive(Debug, Deserialize)]
pub struct ExecuteStoreRequest {
    pub store_id: String,
    pub tenant_id: i64,
}

pub async fn execute_store(
    State(state): State<SharedState>,
    Json(body): Json<ExecuteStoreRequest>,
) -> ApiResult<Json<ExecuteResponse>> {
    let tenant = state
        .tenants
        .iter()
        .find(|t| t.id == body.tenant_id)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown tenant {}", body.tenant_id)))?;

    let summary = state.orchestrator.migrate_store_shards(&body.store_id, tenant).await?;
    Ok(Json(summary.into()))
}
