pub mod connections;
pub mod detection;
pub mod execute;
pub mod health;
pub mod locks;
pub mod schedule;
pub mod schemas;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/schemas/create", post(schemas::create))
        .route("/schemas/list", get(schemas::list))
        .route("/schemas/detail", get(schemas::detail))
        .route("/schemas/history", get(schemas::history))
        .route("/schemas/delete", post(schemas::delete))
        .route("/execute", post(execute::execute))
        .route("/execute-all", post(execute::execute_all))
        .route("/execute-store", post(execute::execute_store))
        .route("/locks/list", get(locks::list))
        .route("/locks/force-release", post(locks::force_release))
        .route("/locks/cleanup", post(locks::cleanup))
        .route("/connections/stats", get(connections::stats))
        .route("/connections/close", post(connections::close))
        .route("/schema-detection/all", get(detection::all))
        .route("/schema-detection/detect-and-save", post(detection::detect_and_save))
        .route("/schema-detection/table", get(detection::table))
        .route("/table-schedule/manual-check", post(schedule::manual_check))
        .route("/log-cleanup/manual", post(schedule::log_cleanup))
}
