use std::sync::Arc;

use anyhow::{Context, Result};
use qc_core::catalog::CatalogStore;
use qc_core::connections::ConnectionRegistry;
use qc_core::health::HealthChecker;
use qc_core::locks::LockManager;
use qc_core::model::TenantDescriptor;
use qc_core::orchestrator::Orchestrator;
use qc_core::scheduler::Scheduler;
use qc_core::shutdown::ShutdownCoordinator;
use qc_core::version_gate::VersionGate;
use qc_core::EngineConfig;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

mod error;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    qc_core::init_logging().context("failed to initialize logging")?;

    let config = EngineConfig::from_env().context("failed to load configuration")?;

    let control_pool = MySqlPoolOptions::new()
        .max_connections(config.pool.max_connections)
        .min_connections(config.pool.min_connections)
        .acquire_timeout(config.pool.acquire_timeout)
        .idle_timeout(config.pool.idle_timeout)
        .connect(&config.control_db.url())
        .await
        .context("failed to connect to control database")?;

    let baseline_pool = MySqlPoolOptions::new()
        .max_connections(config.pool.max_connections)
        .min_connections(config.pool.min_connections)
        .acquire_timeout(config.pool.acquire_timeout)
        .idle_timeout(config.pool.idle_timeout)
        .connect(&config.baseline_db.url())
        .await
        .context("failed to connect to baseline database")?;

    let catalog = CatalogStore::new(control_pool.clone());
    catalog.ensure_schema().await?;
    let locks = LockManager::new(control_pool.clone());
    locks.ensure_schema().await?;
    let version_gate = VersionGate::new(control_pool.clone());
    version_gate.ensure_schema().await?;
    let connections = ConnectionRegistry::new(config.pool.clone());

    let tenants = load_tenants()?;

    let catalog = Arc::new(catalog);
    let locks = Arc::new(locks);
    let version_gate = Arc::new(version_gate);
    let connections = Arc::new(connections);

    let orchestrator = Arc::new(Orchestrator::new(
        catalog.clone(),
        locks.clone(),
        connections.clone(),
        version_gate.clone(),
    ));

    let scheduler = Arc::new(Scheduler::new(
        catalog.clone(),
        connections.clone(),
        config.scheduler.clone(),
        config.retention,
    ));

    let shutdown = Arc::new(ShutdownCoordinator::new(config.server.shutdown_timeout));
    scheduler.clone().spawn(shutdown.clone());

    let health = Arc::new(HealthChecker::new(env!("CARGO_PKG_VERSION")));
    health.register_component("control_db").await;
    health.register_component("baseline_db").await;
    health.register_component("locks").await;

    let app_state = Arc::new(AppState {
        orchestrator,
        catalog,
        locks,
        connections,
        version_gate,
        scheduler,
        tenants: Arc::new(tenants),
        config: Arc::new(config.clone()),
        health,
        control_pool,
        baseline_pool,
    });

    let app = routes::router().with_state(app_state);

    info!(addr = %config.server.bind_address, "schema engine control plane starting");
    let listener = tokio::net::TcpListener::bind(config.server.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("schema engine control plane shut down");
    Ok(())
}

/// Tenant directory is loaded once at startup from a JSON file; the control
/// plane does not expose tenant-directory mutation (spec §9, out of scope).
fn load_tenants() -> Result<Vec<TenantDescriptor>> {
    let Ok(path) = std::env::var("QC_TENANTS_FILE") else {
        return Ok(Vec::new());
    };
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading tenants file {}", path))?;
    let tenants: Vec<TenantDescriptor> =
        serde_json::from_str(&raw).with_context(|| format!("parsing tenants file {}", path))?;
    Ok(tenants)
}

async fn shutdown_signal(coordinator: Arc<ShutdownCoordinator>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    coordinator.shutdown().await;
}
