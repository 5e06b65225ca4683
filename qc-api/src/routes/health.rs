//! `/health` — liveness/readiness for the control plane (ambient, not one of
//! spec §6's business endpoints).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use qc_core::health::checks;

use crate::state::SharedState;

pub async fn health(State(state): State<SharedState>) -> Response {
    state.health.update_component(
        "control_db",
        checks::check_db("control_db", &state.control_pool).await.status,
        None,
    ).await;
    state.health.update_component(
        "baseline_db",
        checks::check_db("baseline_db", &state.baseline_pool).await.status,
        None,
    ).await;

    let active_locks = state.locks.list_active().await.map(|l| l.len()).unwrap_or(0);
    let lock_health = checks::check_locks(active_locks, 50);
    state.health.update_component("locks", lock_health.status, lock_health.message).await;

    let report = state.health.check_health().await;
    let status = StatusCode::from_u16(report.status.to_http_status()).unwrap_or(StatusCode::OK);
    (status, Json(report)).into_response()
}
