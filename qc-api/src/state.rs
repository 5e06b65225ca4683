//! Shared application state wired together at startup and handed to every
//! route handler through axum's `State` extractor.

use std::sync::Arc;

use qc_core::catalog::CatalogStore;
use qc_core::connections::ConnectionRegistry;
use qc_core::health::HealthChecker;
use qc_core::locks::LockManager;
use qc_core::model::TenantDescriptor;
use qc_core::orchestrator::Orchestrator;
use qc_core::scheduler::Scheduler;
use qc_core::version_gate::VersionGate;
use qc_core::EngineConfig;
use sqlx::MySqlPool;

/// Everything a handler needs: the engine's components plus the tenant set
/// migrations fan out over. Tenants are loaded once at startup; the control
/// plane does not (yet) expose tenant-directory mutation endpoints.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub catalog: Arc<CatalogStore>,
    pub locks: Arc<LockManager>,
    pub connections: Arc<ConnectionRegistry>,
    pub version_gate: Arc<VersionGate>,
    pub scheduler: Arc<Scheduler>,
    pub tenants: Arc<Vec<TenantDescriptor>>,
    pub config: Arc<EngineConfig>,
    pub health: Arc<HealthChecker>,
    pub control_pool: MySqlPool,
    /// Reference database the Drift Detector (C7) compares against.
    pub baseline_pool: MySqlPool,
}

pub type SharedState = Arc<AppState>;
