//! Connection Registry (C1): lazy per-(tenant, role) MySQL connection pools.

use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::PoolConfig;
use crate::error::EngineResult;
use crate::model::{DatabaseType, TenantDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoolKey {
    tenant_id: i64,
    role: DatabaseType,
}

/// Caches one pool per `(tenant.id, db_role)`, ensuring the tenant database
/// exists before the pool is opened and re-opening on a dead connection.
pub struct ConnectionRegistry {
    pools: RwLock<HashMap<PoolKey, MySqlPool>>,
    pool_config: PoolConfig,
}

impl ConnectionRegistry {
    pub fn new(pool_config: PoolConfig) -> Self {
        Self { pools: RwLock::new(HashMap::new()), pool_config }
    }

    /// Get (or lazily open) the pool for a tenant's database role.
    pub async fn get_connection(
        &self,
        tenant: &TenantDescriptor,
        role: DatabaseType,
    ) -> EngineResult<MySqlPool> {
        let key = PoolKey { tenant_id: tenant.id, role };

        if let Some(pool) = self.pools.read().await.get(&key).cloned() {
            if self.is_alive(&pool).await {
                return Ok(pool);
            }
            warn!(tenant_id = tenant.id, %role, "cached pool failed liveness check, reopening");
        }

        let db = tenant.resolve_connection(role);
        self.ensure_database_exists(&db).await?;

        let pool = MySqlPoolOptions::new()
            .max_connections(self.pool_config.max_connections)
            .min_connections(self.pool_config.min_connections)
            .acquire_timeout(self.pool_config.acquire_timeout)
            .idle_timeout(self.pool_config.idle_timeout)
            .connect(&db.url())
            .await?;

        self.pools.write().await.insert(key, pool.clone());
        info!(tenant_id = tenant.id, %role, "opened connection pool");
        Ok(pool)
    }

    async fn ensure_database_exists(&self, db: &crate::config::DbConfig) -> EngineResult<()> {
        let admin_pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.pool_config.acquire_timeout)
            .connect(&db.admin_url())
            .await?;

        let stmt = format!(
            "CREATE DATABASE IF NOT EXISTS `{}` CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci",
            db.name
        );
        sqlx::query(&stmt).execute(&admin_pool).await?;
        admin_pool.close().await;
        Ok(())
    }

    async fn is_alive(&self, pool: &MySqlPool) -> bool {
        sqlx::query("SELECT 1").execute(pool).await.is_ok()
    }

    /// Close every cached pool.
    pub async fn close_all(&self) {
        let mut pools = self.pools.write().await;
        for (_, pool) in pools.drain() {
            pool.close().await;
        }
    }

    /// Close every pool belonging to one tenant.
    pub async fn close_for_tenant(&self, tenant_id: i64) {
        let mut pools = self.pools.write().await;
        let keys: Vec<PoolKey> = pools.keys().filter(|k| k.tenant_id == tenant_id).cloned().collect();
        for key in keys {
            if let Some(pool) = pools.remove(&key) {
                pool.close().await;
            }
        }
    }

    /// Stats: the active cache keys, as `(tenant_id, role)` pairs.
    pub async fn active_keys(&self) -> Vec<(i64, DatabaseType)> {
        self.pools.read().await.keys().map(|k| (k.tenant_id, k.role)).collect()
    }

    pub async fn pool_count(&self) -> usize {
        self.pools.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_key_equality_is_by_tenant_and_role() {
        let a = PoolKey { tenant_id: 1, role: DatabaseType::Main };
        let b = PoolKey { tenant_id: 1, role: DatabaseType::Main };
        let c = PoolKey { tenant_id: 1, role: DatabaseType::Log };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
