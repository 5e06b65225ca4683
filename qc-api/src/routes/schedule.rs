//! `table-schedule/manual-check` and `log-cleanup/manual` — on-demand
//! triggers for the two Scheduler (C9) jobs (spec §4.9, §4.11).

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub affected: usize,
}

pub async fn manual_check(State(state): State<SharedState>) -> ApiResult<Json<JobResponse>> {
    let affected = state.scheduler.run_shard_precreation(&state.tenants).await?;
    Ok(Json(JobResponse { affected }))
}

pub async fn log_cleanup(State(state): State<SharedState>) -> ApiResult<Json<JobResponse>> {
    let affected = state.scheduler.run_retention_cleanup(&state.tenants).await?;
    Ok(Json(JobResponse { affected }))
}
