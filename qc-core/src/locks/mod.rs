//! Lock Manager (C3): row-backed mutual exclusion against `qc_migration_locks`.

use chrono::Utc;
use sqlx::{MySql, MySqlPool, Row, Transaction};
use tracing::{info, warn};

use crate::error::{EngineError, EngineResult};
use crate::model::{DatabaseType, LockKey, LockType, MigrationLock, PartitionType};

pub struct LockManager {
    pool: MySqlPool,
}

/// Result of a successful or denied acquire.
pub enum AcquireOutcome {
    Acquired(MigrationLock),
    Conflict(MigrationLock),
}

impl LockManager {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> EngineResult<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS qc_migration_locks (
                id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
                lock_key VARCHAR(255) NOT NULL,
                lock_type VARCHAR(16) NOT NULL,
                table_name VARCHAR(191) NULL,
                database_type VARCHAR(16) NULL,
                partition_type VARCHAR(16) NULL,
                start_time DATETIME(6) NOT NULL,
                lock_holder VARCHAR(255) NOT NULL,
                is_active TINYINT(1) NOT NULL DEFAULT 1,
                KEY idx_active (is_active),
                KEY idx_key (table_name, database_type, partition_type, is_active)
            ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Conflict rules (spec §4.3), evaluated inside a serializable
    /// transaction that scans active locks before inserting the new row.
    pub async fn acquire(&self, lock_type: LockType, key: Option<LockKey>) -> EngineResult<AcquireOutcome> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        let active = Self::load_active_locks(&mut tx).await?;

        if let Some(all_tables) = active.iter().find(|l| l.lock_type == LockType::AllTables) {
            tx.rollback().await?;
            crate::metrics::record_counter("locks.conflicts", 1);
            return Ok(AcquireOutcome::Conflict(all_tables.clone()));
        }

        if lock_type == LockType::AllTables {
            if let Some(existing) = active.into_iter().next() {
                tx.rollback().await?;
                crate::metrics::record_counter("locks.conflicts", 1);
                return Ok(AcquireOutcome::Conflict(existing));
            }
        } else if let Some(key) = &key {
            if let Some(conflict) = active.into_iter().find(|l| {
                l.lock_type == LockType::SingleTable && l.key.as_ref() == Some(key)
            }) {
                tx.rollback().await?;
                crate::metrics::record_counter("locks.conflicts", 1);
                return Ok(AcquireOutcome::Conflict(conflict));
            }
        }

        let now = Utc::now();
        let holder = MigrationLock::new_holder_identity();
        let lock_key = match (&lock_type, &key) {
            (LockType::AllTables, _) => format!("ALL_TABLES_{}", now.timestamp_millis()),
            (LockType::SingleTable, Some(k)) => format!("{}_{}", k.serialized(), now.timestamp_millis()),
            (LockType::SingleTable, None) => {
                return Err(EngineError::Validation(
                    "SINGLE_TABLE lock requires a key".to_string(),
                ))
            }
        };

        sqlx::query(
            "INSERT INTO qc_migration_locks \
             (lock_key, lock_type, table_name, database_type, partition_type, start_time, lock_holder, is_active) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(&lock_key)
        .bind(lock_type_str(lock_type))
        .bind(key.as_ref().map(|k| k.table_name.as_str()))
        .bind(key.as_ref().map(|k| k.database_type.as_str()))
        .bind(key.as_ref().map(|k| k.partition_type.as_str()))
        .bind(now)
        .bind(&holder)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let lock = MigrationLock {
            lock_key: lock_key.clone(),
            lock_type,
            key,
            start_time: now,
            lock_holder: holder,
            is_active: true,
        };
        info!(lock_key = %lock_key, holder = %lock.lock_holder, "lock acquired");
        crate::metrics::record_counter("locks.acquired", 1);
        Ok(AcquireOutcome::Acquired(lock))
    }

    /// Only the original holder may release.
    pub async fn release(&self, lock_key: &str, holder: &str) -> EngineResult<()> {
        let result = sqlx::query(
            "UPDATE qc_migration_locks SET is_active = 0 WHERE lock_key = ? AND lock_holder = ? AND is_active = 1",
        )
        .bind(lock_key)
        .bind(holder)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!(
                "no active lock {} held by {}",
                lock_key, holder
            )));
        }
        info!(lock_key, holder, "lock released");
        Ok(())
    }

    /// Anyone may force-release, bypassing the holder check.
    pub async fn force_release(&self, lock_key: &str) -> EngineResult<()> {
        let result = sqlx::query("UPDATE qc_migration_locks SET is_active = 0 WHERE lock_key = ? AND is_active = 1")
            .bind(lock_key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(format!("no active lock {}", lock_key)));
        }
        warn!(lock_key, "lock force-released");
        Ok(())
    }

    /// Flips stale active locks (age beyond `hours`) to inactive.
    pub async fn cleanup_older_than(&self, hours: i64) -> EngineResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::hours(hours);
        let result = sqlx::query("UPDATE qc_migration_locks SET is_active = 0 WHERE is_active = 1 AND start_time < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        let cleaned = result.rows_affected();
        if cleaned > 0 {
            info!(cleaned, hours, "stale locks cleaned up");
            crate::metrics::record_counter("locks.cleaned", cleaned);
        }
        Ok(cleaned)
    }

    pub async fn list_active(&self) -> EngineResult<Vec<MigrationLock>> {
        let mut tx = self.pool.begin().await?;
        let locks = Self::load_active_locks(&mut tx).await?;
        tx.commit().await?;
        Ok(locks)
    }

    async fn load_active_locks(tx: &mut Transaction<'_, MySql>) -> EngineResult<Vec<MigrationLock>> {
        let rows = sqlx::query(
            "SELECT lock_key, lock_type, table_name, database_type, partition_type, \
                    start_time, lock_holder, is_active \
             FROM qc_migration_locks WHERE is_active = 1 FOR UPDATE",
        )
        .fetch_all(&mut **tx)
        .await?;

        rows.into_iter().map(Self::row_to_lock).collect()
    }

    fn row_to_lock(row: sqlx::mysql::MySqlRow) -> EngineResult<MigrationLock> {
        let lock_type: String = row.try_get("lock_type")?;
        let table_name: Option<String> = row.try_get("table_name")?;
        let database_type: Option<String> = row.try_get("database_type")?;
        let partition_type: Option<String> = row.try_get("partition_type")?;

        let key = match (table_name, database_type, partition_type) {
            (Some(t), Some(d), Some(p)) => Some(LockKey {
                table_name: t,
                database_type: DatabaseType::parse(&d)
                    .ok_or_else(|| EngineError::CatalogConsistency(format!("bad database_type {}", d)))?,
                partition_type: PartitionType::parse(&p)
                    .ok_or_else(|| EngineError::CatalogConsistency(format!("bad partition_type {}", p)))?,
            }),
            _ => None,
        };

        Ok(MigrationLock {
            lock_key: row.try_get("lock_key")?,
            lock_type: match lock_type.as_str() {
                "SINGLE_TABLE" => LockType::SingleTable,
                "ALL_TABLES" => LockType::AllTables,
                other => {
                    return Err(EngineError::CatalogConsistency(format!("bad lock_type {}", other)))
                }
            },
            key,
            start_time: row.try_get("start_time")?,
            lock_holder: row.try_get("lock_holder")?,
            is_active: row.try_get::<i8, _>("is_active")? != 0,
        })
    }
}

fn lock_type_str(t: LockType) -> &'static str {
    match t {
        LockType::SingleTable => "SINGLE_TABLE",
        LockType::AllTables => "ALL_TABLES",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_type_strings() {
        assert_eq!(lock_type_str(LockType::SingleTable), "SINGLE_TABLE");
        assert_eq!(lock_type_str(LockType::AllTables), "ALL_TABLES");
    }
}
