//! `locks/*` — Lock Manager inspection and administration (spec §4.3, §4.11).

use axum::extract::State;
use axum::Json;
use qc_core::model::MigrationLock;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::SharedState;

pub async fn list(State(state): State<SharedState>) -> ApiResult<Json<Vec<MigrationLock>>> {
    Ok(Json(state.locks.list_active().await?))
}

#[derive(Debug, Deserialize)]
pub struct ForceReleaseRequest {
    pub lock_key: String,
}

pub async fn force_release(State(state): State<SharedState>, Json(body): Json<ForceReleaseRequest>) -> ApiResult<()> {
    state.locks.force_release(&body.lock_key).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CleanupRequest {
    pub hours: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub cleaned: u64,
}

pub async fn cleanup(
    State(state): State<SharedState>,
    Json(body): Json<CleanupRequest>,
) -> ApiResult<Json<CleanupResponse>> {
    let hours = body.hours.unwrap_or(state.config.locks.stale_after_hours);
    let cleaned = state.locks.cleanup_older_than(hours).await?;
    Ok(Json(CleanupResponse { cleaned }))
}
