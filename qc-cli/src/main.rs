use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qc_core::catalog::CatalogStore;
use qc_core::connections::ConnectionRegistry;
use qc_core::drift::DriftDetector;
use qc_core::locks::LockManager;
use qc_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use qc_core::model::{DatabaseType, PartitionType, TenantDescriptor};
use qc_core::orchestrator::Orchestrator;
use qc_core::version_gate::VersionGate;
use qc_core::EngineConfig;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "qc-cli")]
#[command(author, version, about = "Operator CLI for the schema evolution engine", long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Path to a JSON file of tenant descriptors; defaults to an empty tenant set
    #[arg(long, env = "QC_TENANTS_FILE")]
    tenants_file: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every active schema version in the catalog
    SchemasList,
    /// Show the version history for a table
    SchemasHistory {
        table_name: String,
        database_type: String,
    },
    /// Migrate a single table across all active tenants
    Migrate {
        table_name: String,
        database_type: String,
        #[arg(long)]
        partition_type: Option<String>,
        #[arg(long)]
        version: Option<String>,
    },
    /// Migrate every active schema across all active tenants
    MigrateAll,
    /// Reconcile a single store shard for one tenant
    MigrateStore { store_id: String, tenant_id: i64 },
    /// List currently held migration locks
    LocksList,
    /// Force-release a stuck lock
    LocksRelease { lock_key: String },
    /// Release locks older than the configured staleness threshold
    LocksCleanup {
        #[arg(long)]
        hours: Option<i64>,
    },
    /// Show pooled connection counts
    ConnectionsStats,
    /// Close pooled connections for one tenant
    ConnectionsClose { tenant_id: i64 },
    /// Compare the baseline database against the catalog and print proposals
    DetectDrift,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = LogLevel::from_str(&args.log_level).unwrap_or_else(|| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        LogLevel::Info
    });
    let log_config = LogConfig::new(log_level).json_format(args.json_logs);
    init_logging_with_config(log_config)?;

    let config = EngineConfig::from_env().context("failed to load configuration")?;

    let control_pool = MySqlPoolOptions::new()
        .max_connections(config.pool.max_connections)
        .min_connections(config.pool.min_connections)
        .acquire_timeout(config.pool.acquire_timeout)
        .idle_timeout(config.pool.idle_timeout)
        .connect(&config.control_db.url())
        .await
        .context("failed to connect to control database")?;

    let catalog = Arc::new(CatalogStore::new(control_pool.clone()));
    catalog.ensure_schema().await?;
    let locks = Arc::new(LockManager::new(control_pool.clone()));
    locks.ensure_schema().await?;
    let version_gate = Arc::new(VersionGate::new(control_pool.clone()));
    version_gate.ensure_schema().await?;
    let connections = Arc::new(ConnectionRegistry::new(config.pool.clone()));

    let tenants = load_tenants(args.tenants_file.as_deref())?;

    match args.command {
        Command::SchemasList => {
            let schemas = catalog.list_all_active().await?;
            println!("{}", serde_json::to_string_pretty(&schemas)?);
        }
        Command::SchemasHistory { table_name, database_type } => {
            let db = parse_database_type(&database_type)?;
            let history = catalog.history(&table_name, db).await?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        Command::Migrate { table_name, database_type, partition_type, version } => {
            let orchestrator = Orchestrator::new(catalog.clone(), locks.clone(), connections.clone(), version_gate.clone());
            let db = parse_database_type(&database_type)?;
            let partition = partition_type.as_deref().map(parse_partition_type).transpose()?;
            let summary = orchestrator.migrate_table(&table_name, db, partition, version.as_deref(), &tenants).await?;
            info!(batch = %summary.migration_batch_id, "migration complete");
            println!("{:#?}", summary);
        }
        Command::MigrateAll => {
            let orchestrator = Orchestrator::new(catalog.clone(), locks.clone(), connections.clone(), version_gate.clone());
            let summary = orchestrator.migrate_all_tables(&tenants).await?;
            println!("{:#?}", summary);
        }
        Command::MigrateStore { store_id, tenant_id } => {
            let orchestrator = Orchestrator::new(catalog.clone(), locks.clone(), connections.clone(), version_gate.clone());
            let tenant = tenants.iter().find(|t| t.id == tenant_id).context("unknown tenant")?;
            let summary = orchestrator.migrate_store_shards(&store_id, tenant).await?;
            println!("{:#?}", summary);
        }
        Command::LocksList => {
            let active = locks.list_active().await?;
            println!("{}", serde_json::to_string_pretty(&active)?);
        }
        Command::LocksRelease { lock_key } => {
            locks.force_release(&lock_key).await?;
            println!("released {}", lock_key);
        }
        Command::LocksCleanup { hours } => {
            let hours = hours.unwrap_or(config.locks.stale_after_hours);
            let cleaned = locks.cleanup_older_than(hours).await?;
            println!("cleaned {} stale lock(s)", cleaned);
        }
        Command::ConnectionsStats => {
            let count = connections.pool_count().await;
            let keys = connections.active_keys().await;
            println!("pools: {}", count);
            for (tenant_id, db) in keys {
                println!("  tenant={} database_type={}", tenant_id, db);
            }
        }
        Command::ConnectionsClose { tenant_id } => {
            connections.close_for_tenant(tenant_id).await;
            println!("closed pools for tenant {}", tenant_id);
        }
        Command::DetectDrift => {
            let baseline_pool = MySqlPoolOptions::new()
                .max_connections(config.pool.max_connections)
                .min_connections(config.pool.min_connections)
                .acquire_timeout(config.pool.acquire_timeout)
                .idle_timeout(config.pool.idle_timeout)
                .connect(&config.baseline_db.url())
                .await
                .context("failed to connect to baseline database")?;
            let active = catalog.list_all_active().await?;
            let proposals = DriftDetector::detect(&baseline_pool, &active).await?;
            println!("{:#?}", proposals);
        }
    }

    Ok(())
}

fn load_tenants(path: Option<&str>) -> Result<Vec<TenantDescriptor>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading tenants file {}", path))?;
    let tenants: Vec<TenantDescriptor> =
        serde_json::from_str(&raw).with_context(|| format!("parsing tenants file {}", path))?;
    Ok(tenants)
}

fn parse_database_type(raw: &str) -> Result<DatabaseType> {
    DatabaseType::parse(raw).ok_or_else(|| anyhow::anyhow!("unknown database_type {}", raw))
}

fn parse_partition_type(raw: &str) -> Result<PartitionType> {
    PartitionType::parse(raw).ok_or_else(|| anyhow::anyhow!("unknown partition_type {}", raw))
}
