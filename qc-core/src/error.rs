//! Top-level error taxonomy for the schema engine (spec §7).

use thiserror::Error;

use crate::model::MigrationLock;

/// The seven error kinds the engine's operations can surface.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed inputs: missing fields, unknown `database_type`/`partition_type`,
    /// invalid version bump, invalid `schema_definition`.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The Lock Manager denied acquisition; carries the conflicting lock.
    #[error("lock conflict: requested lock denied by active lock {0:?}")]
    LockConflict(Box<MigrationLock>),

    /// No active catalog entry matches the request.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller omitted `partition_type` and multiple partition types exist.
    #[error("disambiguation required: candidates are {0:?}")]
    DisambiguationRequired(Vec<String>),

    /// A single DDL statement failed during Phases A-D; non-fatal, collected
    /// into the batch report rather than aborting the reconcile.
    #[error("transient SQL error: {0}")]
    TransientSql(String),

    /// Loss of connection, missing `INFORMATION_SCHEMA`, or inability to read
    /// required metadata; aborts the current reconcile.
    #[error("fatal SQL error: {0}")]
    FatalSql(#[from] sqlx::Error),

    /// Inability to atomically demote the predecessor active catalog row.
    #[error("catalog consistency error: {0}")]
    CatalogConsistency(String),

    /// Configuration is invalid (propagated from `qc_core::config`).
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// True for errors that should abort the surrounding reconcile/sweep
    /// rather than being collected and continued past.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::FatalSql(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_sql_is_fatal() {
        let err = EngineError::FatalSql(sqlx::Error::PoolClosed);
        assert!(err.is_fatal());
    }

    #[test]
    fn transient_sql_is_not_fatal() {
        let err = EngineError::TransientSql("duplicate column".into());
        assert!(!err.is_fatal());
    }
}
