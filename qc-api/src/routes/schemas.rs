//! `schemas/*` — catalog CRUD (spec §4.11).

use axum::extract::{Query, State};
use axum::Json;
use qc_core::model::{DatabaseType, PartitionType, TableDefinitionDto, TableSchema, TimeInterval};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct CreateSchemaRequest {
    pub table_name: String,
    pub database_type: String,
    pub partition_type: String,
    pub time_interval: Option<String>,
    pub time_format: Option<String>,
    pub schema_version: String,
    pub schema_definition: TableDefinitionDto,
    pub upgrade_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSchemaResponse {
    pub id: i64,
}

pub async fn create(
    State(state): State<SharedState>,
    Json(body): Json<CreateSchemaRequest>,
) -> ApiResult<Json<CreateSchemaResponse>> {
    let database_type = parse_database_type(&body.database_type)?;
    let partition_type = parse_partition_type(&body.partition_type)?;
    let time_interval = body
        .time_interval
        .as_deref()
        .map(parse_time_interval)
        .transpose()?;

    let schema = TableSchema {
        id: 0,
        table_name: body.table_name,
        database_type,
        partition_type,
        time_interval,
        time_format: body.time_format,
        schema_version: body.schema_version,
        schema_definition: body.schema_definition,
        is_active: true,
        upgrade_notes: body.upgrade_notes,
        changes_detected: None,
        created_at: chrono::Utc::now(),
    };

    let id = state.catalog.put_new_version(&schema).await?;
    Ok(Json(CreateSchemaResponse { id }))
}

pub async fn list(State(state): State<SharedState>) -> ApiResult<Json<Vec<TableSchema>>> {
    Ok(Json(state.catalog.list_all_active().await?))
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    pub table_name: String,
    pub database_type: String,
    pub partition_type: Option<String>,
}

pub async fn detail(
    State(state): State<SharedState>,
    Query(q): Query<DetailQuery>,
) -> ApiResult<Json<TableSchema>> {
    let database_type = parse_database_type(&q.database_type)?;
    let partition_type = q.partition_type.as_deref().map(parse_partition_type).transpose()?;
    let schema = state.catalog.resolve_active(&q.table_name, database_type, partition_type).await?;
    Ok(Json(schema))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub table_name: String,
    pub database_type: String,
}

pub async fn history(
    State(state): State<SharedState>,
    Query(q): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<TableSchema>>> {
    let database_type = parse_database_type(&q.database_type)?;
    Ok(Json(state.catalog.history(&q.table_name, database_type).await?))
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub table_name: String,
    pub database_type: String,
    pub partition_type: String,
}

pub async fn delete(State(state): State<SharedState>, Json(body): Json<DeleteRequest>) -> ApiResult<()> {
    let database_type = parse_database_type(&body.database_type)?;
    let partition_type = parse_partition_type(&body.partition_type)?;
    state.catalog.soft_delete(&body.table_name, database_type, partition_type).await?;
    Ok(())
}

pub fn parse_database_type(raw: &str) -> Result<DatabaseType, ApiError> {
    DatabaseType::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("unknown database_type {}", raw)))
}

pub fn parse_partition_type(raw: &str) -> Result<PartitionType, ApiError> {
    PartitionType::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("unknown partition_type {}", raw)))
}

pub fn parse_time_interval(raw: &str) -> Result<TimeInterval, ApiError> {
    TimeInterval::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("unknown time_interval {}", raw)))
}
