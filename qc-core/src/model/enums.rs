use serde::{Deserialize, Serialize};
use std::fmt;

/// Which per-tenant database role a table lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    Main,
    Log,
    Order,
    Static,
}

impl DatabaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::Main => "main",
            DatabaseType::Log => "log",
            DatabaseType::Order => "order",
            DatabaseType::Static => "static",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "main" => Some(DatabaseType::Main),
            "log" => Some(DatabaseType::Log),
            "order" => Some(DatabaseType::Order),
            "static" => Some(DatabaseType::Static),
            _ => None,
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a logical table expands into one, per-store, or per-time-window
/// physical tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PartitionType {
    None,
    Store,
    Time,
}

impl PartitionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionType::None => "none",
            PartitionType::Store => "store",
            PartitionType::Time => "time",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(PartitionType::None),
            "store" => Some(PartitionType::Store),
            "time" => Some(PartitionType::Time),
            _ => None,
        }
    }
}

impl fmt::Display for PartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time-shard granularity (`partition_type = time` only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TimeInterval {
    Day,
    Month,
    Year,
}

impl TimeInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInterval::Day => "day",
            TimeInterval::Month => "month",
            TimeInterval::Year => "year",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Some(TimeInterval::Day),
            "month" => Some(TimeInterval::Month),
            "year" => Some(TimeInterval::Year),
            _ => None,
        }
    }

    /// Default suffix format when `TableSchema.time_format` is absent.
    pub fn default_format(&self) -> &'static str {
        match self {
            TimeInterval::Day => "_YYYYMMDD",
            TimeInterval::Month => "_YYYYMM",
            TimeInterval::Year => "_YYYY",
        }
    }
}

/// The kind of DDL a `MigrationHistoryEntry` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MigrationType {
    Create,
    Alter,
    Drop,
    Index,
}

/// Outcome of a single DDL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

/// The kind of mutual-exclusion lock held by the Lock Manager (C3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LockType {
    SingleTable,
    AllTables,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_type_roundtrip() {
        for t in [DatabaseType::Main, DatabaseType::Log, DatabaseType::Order, DatabaseType::Static] {
            assert_eq!(DatabaseType::parse(t.as_str()), Some(t));
        }
    }

    #[test]
    fn partition_type_roundtrip() {
        for t in [PartitionType::None, PartitionType::Store, PartitionType::Time] {
            assert_eq!(PartitionType::parse(t.as_str()), Some(t));
        }
    }

    #[test]
    fn time_interval_default_formats() {
        assert_eq!(TimeInterval::Day.default_format(), "_YYYYMMDD");
        assert_eq!(TimeInterval::Month.default_format(), "_YYYYMM");
        assert_eq!(TimeInterval::Year.default_format(), "_YYYY");
    }
}
