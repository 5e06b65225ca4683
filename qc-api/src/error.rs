use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use qc_core::EngineError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Engine(EngineError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Engine(EngineError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Engine(EngineError::DisambiguationRequired(candidates)) => (
                StatusCode::CONFLICT,
                format!("ambiguous request, candidates: {}", candidates.join(", ")),
            ),
            ApiError::Engine(EngineError::LockConflict(lock)) => {
                (StatusCode::CONFLICT, format!("denied by active lock {}", lock.lock_key))
            }
            ApiError::Engine(e @ EngineError::TransientSql(_)) => (StatusCode::BAD_GATEWAY, e.to_string()),
            ApiError::Engine(e @ EngineError::FatalSql(_)) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Engine(e @ EngineError::CatalogConsistency(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Engine(e @ EngineError::Config(_)) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use qc_core::model::{LockType, MigrationLock};

    fn response_status(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let err = ApiError::Engine(EngineError::Validation("bad input".into()));
        assert_eq!(response_status(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::Engine(EngineError::NotFound("no such table".into()));
        assert_eq!(response_status(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn lock_conflict_maps_to_conflict() {
        let lock = MigrationLock {
            lock_key: "orders".to_string(),
            lock_type: LockType::SingleTable,
            key: None,
            start_time: Utc::now(),
            lock_holder: "host-1-00000001".to_string(),
            is_active: true,
        };
        let err = ApiError::Engine(EngineError::LockConflict(Box::new(lock)));
        assert_eq!(response_status(err), StatusCode::CONFLICT);
    }

    #[test]
    fn bad_request_variant_maps_to_400() {
        let err = ApiError::BadRequest("unknown database_type xyz".into());
        assert_eq!(response_status(err), StatusCode::BAD_REQUEST);
    }
}
