use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DatabaseType, PartitionType, TimeInterval};
use crate::model::table_definition::{TableDefinition, TableDefinitionDto};

/// One version of one logical table's desired structure (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub id: i64,
    pub table_name: String,
    pub database_type: DatabaseType,
    pub partition_type: PartitionType,
    pub time_interval: Option<TimeInterval>,
    pub time_format: Option<String>,
    pub schema_version: String,
    pub schema_definition: TableDefinitionDto,
    pub is_active: bool,
    pub upgrade_notes: Option<String>,
    pub changes_detected: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TableSchema {
    /// The `(table_name, database_type, partition_type)` key invariant I2
    /// enforces uniqueness of an active row over.
    pub fn key(&self) -> (String, DatabaseType, PartitionType) {
        (self.table_name.clone(), self.database_type, self.partition_type)
    }

    pub fn definition(&self) -> TableDefinition {
        self.schema_definition.clone().into()
    }

    /// Invariant I3: time-sharded schemas must carry both fields.
    pub fn validate_time_fields(&self) -> Result<(), String> {
        if self.partition_type == PartitionType::Time
            && (self.time_interval.is_none() || self.time_format.is_none())
        {
            return Err(
                "partition_type = time requires both time_interval and time_format".to_string()
            );
        }
        Ok(())
    }

    /// The effective shard suffix format: explicit `time_format`, or the
    /// per-interval default.
    pub fn effective_time_format(&self) -> Option<&str> {
        match (&self.time_format, self.time_interval) {
            (Some(f), _) => Some(f.as_str()),
            (None, Some(interval)) => Some(interval.default_format()),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::table_definition::Column;

    fn sample(partition_type: PartitionType, time_interval: Option<TimeInterval>) -> TableSchema {
        TableSchema {
            id: 1,
            table_name: "users".to_string(),
            database_type: DatabaseType::Main,
            partition_type,
            time_interval,
            time_format: None,
            schema_version: "1.0.0".to_string(),
            schema_definition: TableDefinitionDto {
                table_name: "users".to_string(),
                action: None,
                columns: vec![],
                indexes: vec![],
            },
            is_active: true,
            upgrade_notes: None,
            changes_detected: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn time_partition_requires_interval_and_format() {
        let s = sample(PartitionType::Time, None);
        assert!(s.validate_time_fields().is_err());

        let s = sample(PartitionType::Time, Some(TimeInterval::Month));
        assert!(s.validate_time_fields().is_err()); // time_format still unset on this helper

        let mut s = sample(PartitionType::Time, Some(TimeInterval::Month));
        s.time_format = Some("_YYYYMM".to_string());
        assert!(s.validate_time_fields().is_ok());
    }

    #[test]
    fn none_partition_never_requires_time_fields() {
        let s = sample(PartitionType::None, None);
        assert!(s.validate_time_fields().is_ok());
    }

    #[test]
    fn effective_time_format_falls_back_to_default() {
        let mut s = sample(PartitionType::Time, Some(TimeInterval::Day));
        assert_eq!(s.effective_time_format(), Some("_YYYYMMDD"));
        s.time_format = Some("_YYYY_MM_DD".to_string());
        assert_eq!(s.effective_time_format(), Some("_YYYY_MM_DD"));
    }

    #[test]
    fn key_is_the_uniqueness_triple() {
        let s = sample(PartitionType::None, None);
        assert_eq!(s.key(), ("users".to_string(), DatabaseType::Main, PartitionType::None));
    }

    #[test]
    fn definition_roundtrips_columns() {
        let mut s = sample(PartitionType::None, None);
        s.schema_definition.columns.push(Column {
            name: "id".to_string(),
            type_name: crate::model::table_definition::ColumnType::new("INT"),
            length: None,
            precision: None,
            scale: None,
            values: None,
            allow_null: Some(false),
            default_value: None,
            primary_key: true,
            auto_increment: true,
            unique: false,
            comment: None,
        });
        match s.definition() {
            TableDefinition::Columns { columns, .. } => assert_eq!(columns.len(), 1),
            _ => panic!("expected Columns"),
        }
    }
}
