//! `connections/*` — Connection Registry inspection and administration
//! (spec §4.1, §4.11).

use axum::extract::State;
use axum::Json;
use qc_core::model::DatabaseType;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct ConnectionStatsResponse {
    pub pool_count: usize,
    pub active_keys: Vec<ActiveKeyDto>,
}

#[derive(Debug, Serialize)]
pub struct ActiveKeyDto {
    pub tenant_id: i64,
    pub database_type: DatabaseType,
}

pub async fn stats(State(state): State<SharedState>) -> ApiResult<Json<ConnectionStatsResponse>> {
    let pool_count = state.connections.pool_count().await;
    let active_keys = state
        .connections
        .active_keys()
        .await
        .into_iter()
        .map(|(tenant_id, database_type)| ActiveKeyDto { tenant_id, database_type })
        .collect();
    Ok(Json(ConnectionStatsResponse { pool_count, active_keys }))
}

#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    pub tenant_id: i64,
}

pub async fn close(State(state): State<SharedState>, Json(body): Json<CloseRequest>) -> ApiResult<()> {
    state.connections.close_for_tenant(body.tenant_id).await;
    Ok(())
}
