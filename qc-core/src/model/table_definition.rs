use serde::{Deserialize, Serialize};

/// A target column's type name, e.g. `VARCHAR`, `INT`, `DECIMAL`, `ENUM`.
/// Kept as a thin wrapper rather than an exhaustive enum since MySQL's type
/// vocabulary is large and the reconcile phases only need normalized
/// comparison, not type-specific behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType(pub String);

impl ColumnType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Upper-case and strip any parenthesized length/precision suffix, per
    /// the Phase C normalization rule (spec §4.5).
    pub fn normalized(&self) -> String {
        let upper = self.0.to_ascii_uppercase();
        match upper.find('(') {
            Some(idx) => upper[..idx].trim().to_string(),
            None => upper.trim().to_string(),
        }
    }
}

/// MySQL types emitted without a `(length)` clause (spec §4.5).
pub const LENGTH_SUPPRESSED_TYPES: &[&str] = &[
    "TINYBLOB", "BLOB", "MEDIUMBLOB", "LONGBLOB", "TINYTEXT", "TEXT", "MEDIUMTEXT", "LONGTEXT",
    "JSON", "GEOMETRY", "POINT", "LINESTRING", "POLYGON", "MULTIPOINT", "MULTILINESTRING",
    "MULTIPOLYGON", "GEOMETRYCOLLECTION", "DATE", "TIME", "DATETIME", "TIMESTAMP", "YEAR", "ENUM",
    "SET",
];

/// A column default value, recognizing the two timestamp sentinels that are
/// emitted un-quoted; every other default is string-escaped (spec §4.5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    CurrentTimestamp,
    CurrentTimestampOnUpdate,
    Literal(String),
}

impl DefaultValue {
    const SENTINEL_CURRENT: &'static str = "CURRENT_TIMESTAMP";
    const SENTINEL_CURRENT_ON_UPDATE: &'static str = "CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP";

    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case(Self::SENTINEL_CURRENT_ON_UPDATE) {
            DefaultValue::CurrentTimestampOnUpdate
        } else if trimmed.eq_ignore_ascii_case(Self::SENTINEL_CURRENT) {
            DefaultValue::CurrentTimestamp
        } else {
            DefaultValue::Literal(trimmed.to_string())
        }
    }

    /// Textual form used for the Phase C equality comparison (after trimming).
    pub fn comparable(&self) -> String {
        match self {
            DefaultValue::CurrentTimestamp => Self::SENTINEL_CURRENT.to_string(),
            DefaultValue::CurrentTimestampOnUpdate => Self::SENTINEL_CURRENT_ON_UPDATE.to_string(),
            DefaultValue::Literal(v) => v.trim().to_string(),
        }
    }
}

/// A single column of a `TableDefinition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: ColumnType,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    /// Enumerated value set; only meaningful for ENUM/SET types.
    #[serde(default, rename = "values", skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    /// `None` means "unspecified" which is treated as `allowNull = true`
    /// (spec §4.5, nullable normalization rule).
    #[serde(default, rename = "allowNull")]
    pub allow_null: Option<bool>,
    #[serde(default, rename = "defaultValue", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultValue>,
    #[serde(default, rename = "primaryKey")]
    pub primary_key: bool,
    #[serde(default, rename = "autoIncrement")]
    pub auto_increment: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Column {
    /// Effective nullability: an unspecified target default is nullable.
    pub fn effective_allow_null(&self) -> bool {
        self.allow_null.unwrap_or(true)
    }

    /// Comment normalized the way Phase C compares it: trimmed, NULL/absent
    /// treated as empty.
    pub fn comment_comparable(&self) -> String {
        self.comment.as_deref().unwrap_or("").trim().to_string()
    }
}

/// A named index over one or more columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

/// The target structure the Reconciliation Engine (C5) drives a physical
/// table toward — either a tombstone (`Drop`) or a full column/index set.
#[derive(Debug, Clone, PartialEq)]
pub enum TableDefinition {
    Drop { table_name: String },
    Columns { table_name: String, columns: Vec<Column>, indexes: Vec<Index> },
}

impl TableDefinition {
    pub fn table_name(&self) -> &str {
        match self {
            TableDefinition::Drop { table_name } => table_name,
            TableDefinition::Columns { table_name, .. } => table_name,
        }
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, TableDefinition::Drop { .. })
    }

    /// A column is unique if it's marked `primaryKey` or `unique`; used to
    /// deduplicate single-column unique indexes in Phase D / drift diffing.
    pub fn single_column_unique_names(&self) -> Vec<&str> {
        match self {
            TableDefinition::Drop { .. } => vec![],
            TableDefinition::Columns { columns, .. } => columns
                .iter()
                .filter(|c| c.unique || c.primary_key)
                .map(|c| c.name.as_str())
                .collect(),
        }
    }
}

/// Wire-format DTO matching the JSON shape described in spec §3
/// (`{tableName, action?, columns[], indexes[]}`); the API layer and the
/// catalog's `schema_definition` JSON column both go through this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefinitionDto {
    #[serde(rename = "tableName")]
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub indexes: Vec<Index>,
}

impl From<&TableDefinition> for TableDefinitionDto {
    fn from(def: &TableDefinition) -> Self {
        match def {
            TableDefinition::Drop { table_name } => TableDefinitionDto {
                table_name: table_name.clone(),
                action: Some("DROP".to_string()),
                columns: vec![],
                indexes: vec![],
            },
            TableDefinition::Columns { table_name, columns, indexes } => TableDefinitionDto {
                table_name: table_name.clone(),
                action: None,
                columns: columns.clone(),
                indexes: indexes.clone(),
            },
        }
    }
}

impl From<TableDefinitionDto> for TableDefinition {
    fn from(dto: TableDefinitionDto) -> Self {
        match dto.action.as_deref() {
            Some(a) if a.eq_ignore_ascii_case("DROP") => {
                TableDefinition::Drop { table_name: dto.table_name }
            }
            _ => TableDefinition::Columns {
                table_name: dto.table_name,
                columns: dto.columns,
                indexes: dto.indexes,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_strips_length() {
        assert_eq!(ColumnType::new("varchar(100)").normalized(), "VARCHAR");
        assert_eq!(ColumnType::new("INT").normalized(), "INT");
        assert_eq!(ColumnType::new("decimal(10,2)").normalized(), "DECIMAL");
    }

    #[test]
    fn default_value_sentinel_parsing() {
        assert_eq!(DefaultValue::parse("CURRENT_TIMESTAMP"), DefaultValue::CurrentTimestamp);
        assert_eq!(
            DefaultValue::parse("current_timestamp on update current_timestamp"),
            DefaultValue::CurrentTimestampOnUpdate
        );
        assert_eq!(DefaultValue::parse("'active'"), DefaultValue::Literal("'active'".to_string()));
    }

    #[test]
    fn dto_roundtrip_for_drop() {
        let def = TableDefinition::Drop { table_name: "legacy_events".to_string() };
        let dto: TableDefinitionDto = (&def).into();
        assert_eq!(dto.action.as_deref(), Some("DROP"));
        let back: TableDefinition = dto.into();
        assert_eq!(back, def);
    }

    #[test]
    fn effective_allow_null_defaults_true() {
        let col = Column {
            name: "phone".to_string(),
            type_name: ColumnType::new("VARCHAR"),
            length: Some(20),
            precision: None,
            scale: None,
            values: None,
            allow_null: None,
            default_value: None,
            primary_key: false,
            auto_increment: false,
            unique: false,
            comment: None,
        };
        assert!(col.effective_allow_null());
    }
}
