use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{PartitionType, TimeInterval};

/// The expansion-mode string a `MigrationVersion` memo is additionally keyed
/// on, alongside `(enterprise_id, table_name, database_type)` (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionRule {
    None,
    Store,
    TimeDay,
    TimeMonth,
    TimeYear,
}

impl PartitionRule {
    pub fn from_schema(partition_type: PartitionType, time_interval: Option<TimeInterval>) -> Self {
        match (partition_type, time_interval) {
            (PartitionType::None, _) => PartitionRule::None,
            (PartitionType::Store, _) => PartitionRule::Store,
            (PartitionType::Time, Some(TimeInterval::Day)) => PartitionRule::TimeDay,
            (PartitionType::Time, Some(TimeInterval::Month)) => PartitionRule::TimeMonth,
            (PartitionType::Time, Some(TimeInterval::Year)) => PartitionRule::TimeYear,
            (PartitionType::Time, None) => PartitionRule::TimeDay,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionRule::None => "none",
            PartitionRule::Store => "store",
            PartitionRule::TimeDay => "time_day",
            PartitionRule::TimeMonth => "time_month",
            PartitionRule::TimeYear => "time_year",
        }
    }
}

impl fmt::Display for PartitionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Version Gate memo (C10): records the last version a tenant's physical
/// table was reconciled to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationVersion {
    pub enterprise_id: i64,
    pub table_name: String,
    pub database_type: String,
    pub partition_rule: String,
    pub current_migrated_version: String,
    pub migration_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_rule_from_schema() {
        assert_eq!(PartitionRule::from_schema(PartitionType::None, None), PartitionRule::None);
        assert_eq!(PartitionRule::from_schema(PartitionType::Store, None), PartitionRule::Store);
        assert_eq!(
            PartitionRule::from_schema(PartitionType::Time, Some(TimeInterval::Month)),
            PartitionRule::TimeMonth
        );
    }
}
