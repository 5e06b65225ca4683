use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DatabaseType, LockType, PartitionType};

/// The `(table_name, database_type, partition_type)` a `SINGLE_TABLE` lock
/// is keyed on; `None` for `ALL_TABLES` locks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockKey {
    pub table_name: String,
    pub database_type: DatabaseType,
    pub partition_type: PartitionType,
}

impl LockKey {
    /// Deterministic string form used inside the persisted `lock_key`.
    pub fn serialized(&self) -> String {
        format!("{}:{}:{}", self.table_name, self.database_type, self.partition_type)
    }
}

/// A row-backed mutual-exclusion lock (spec §3, §4.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationLock {
    pub lock_key: String,
    pub lock_type: LockType,
    pub key: Option<LockKey>,
    pub start_time: DateTime<Utc>,
    pub lock_holder: String,
    pub is_active: bool,
}

impl MigrationLock {
    /// `host-pid-nonce`, unique per acquiring process+attempt (spec §4.3).
    pub fn new_holder_identity() -> String {
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown-host".to_string());
        let pid = std::process::id();
        let nonce: u32 = rand::random();
        format!("{}-{}-{:08x}", host, pid, nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_serialization_is_deterministic() {
        let key = LockKey {
            table_name: "orders".to_string(),
            database_type: DatabaseType::Order,
            partition_type: PartitionType::Store,
        };
        assert_eq!(key.serialized(), "orders:order:store");
    }

    #[test]
    fn holder_identity_contains_pid() {
        let holder = MigrationLock::new_holder_identity();
        assert!(holder.contains(&std::process::id().to_string()));
    }
}
