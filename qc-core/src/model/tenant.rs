use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::DatabaseType;
use crate::config::DbConfig;

/// Only tenants in `Normal` status are migrated (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Normal,
    Suspended,
    Disabled,
}

/// A predicate describing which rows of the store-directory table count as
/// "active", e.g. `status = 1`. Configuration, not a heuristic (spec §9 open
/// question #1, decided in SPEC_FULL.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivePredicate {
    pub column: String,
    pub equals: String,
}

/// Per-tenant configuration for store-shard enumeration (C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDirectoryConfig {
    pub store_table_name: String,
    pub store_id_column: String,
    pub active_predicate: ActivePredicate,
}

/// Opaque-to-the-engine tenant record, carrying just enough for C1/C6/C8 to
/// operate: identity, status, and per-role connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantDescriptor {
    pub id: i64,
    pub status: TenantStatus,
    pub connections: HashMap<DatabaseType, DbConfig>,
    pub store_directory: Option<StoreDirectoryConfig>,
}

impl TenantDescriptor {
    /// Resolve the connection tuple for a role, falling back to `main` with
    /// a derived database-name suffix when the role-specific tuple is absent
    /// (spec §3, §4.1).
    pub fn resolve_connection(&self, role: DatabaseType) -> DbConfig {
        if let Some(cfg) = self.connections.get(&role) {
            return cfg.clone();
        }
        let main = self
            .connections
            .get(&DatabaseType::Main)
            .cloned()
            .unwrap_or_default();
        match role {
            DatabaseType::Main => main,
            DatabaseType::Log => DbConfig { name: format!("{}_log", main.name), ..main },
            DatabaseType::Order => DbConfig { name: format!("{}_order", main.name), ..main },
            DatabaseType::Static => DbConfig { name: format!("{}_static", main.name), ..main },
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_db() -> DbConfig {
        DbConfig {
            host: "db1".to_string(),
            port: 3306,
            user: "tenant7".to_string(),
            password: "pw".to_string(),
            name: "tenant7_main".to_string(),
        }
    }

    #[test]
    fn falls_back_to_main_with_derived_suffix() {
        let mut connections = HashMap::new();
        connections.insert(DatabaseType::Main, main_db());
        let tenant = TenantDescriptor {
            id: 7,
            status: TenantStatus::Normal,
            connections,
            store_directory: None,
        };

        let log = tenant.resolve_connection(DatabaseType::Log);
        assert_eq!(log.name, "tenant7_main_log");
        assert_eq!(log.host, "db1");

        let order = tenant.resolve_connection(DatabaseType::Order);
        assert_eq!(order.name, "tenant7_main_order");
    }

    #[test]
    fn uses_explicit_role_tuple_when_present() {
        let mut connections = HashMap::new();
        connections.insert(DatabaseType::Main, main_db());
        connections.insert(
            DatabaseType::Log,
            DbConfig { name: "tenant7_dedicated_log".to_string(), ..main_db() },
        );
        let tenant = TenantDescriptor {
            id: 7,
            status: TenantStatus::Normal,
            connections,
            store_directory: None,
        };

        assert_eq!(tenant.resolve_connection(DatabaseType::Log).name, "tenant7_dedicated_log");
    }

    #[test]
    fn only_normal_status_is_active() {
        let tenant = TenantDescriptor {
            id: 1,
            status: TenantStatus::Suspended,
            connections: HashMap::new(),
            store_directory: None,
        };
        assert!(!tenant.is_active());
    }
}
