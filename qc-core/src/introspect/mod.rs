//! SQL Introspector (C4): reads live table structure from
//! `INFORMATION_SCHEMA` for a given connection.

use sqlx::{MySqlPool, Row};
use std::collections::BTreeMap;

use crate::error::EngineResult;

/// A single live column, as read from `INFORMATION_SCHEMA.COLUMNS`.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveColumn {
    pub name: String,
    pub data_type: String,
    /// Full `COLUMN_TYPE`, e.g. `enum('a','b')` — needed to parse enumerated
    /// value sets.
    pub column_type: String,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub default_value: Option<String>,
    /// `PRI` / `UNI` / empty.
    pub key_role: String,
    /// e.g. `auto_increment`.
    pub extra: String,
    pub comment: String,
}

impl LiveColumn {
    pub fn is_primary_key(&self) -> bool {
        self.key_role == "PRI"
    }

    pub fn is_auto_increment(&self) -> bool {
        self.extra.contains("auto_increment")
    }

    /// Parse enumerated value sets from `COLUMN_TYPE`, e.g.
    /// `enum('a','b','c''c')` -> `["a", "b", "c'c"]`, honoring doubled-quote
    /// escaping.
    pub fn enum_values(&self) -> Option<Vec<String>> {
        let lower = self.column_type.to_ascii_lowercase();
        if !(lower.starts_with("enum(") || lower.starts_with("set(")) {
            return None;
        }
        let start = self.column_type.find('(')? + 1;
        let end = self.column_type.rfind(')')?;
        let inner = &self.column_type[start..end];
        Some(parse_quoted_value_list(inner))
    }
}

/// Split a comma-separated list of single-quoted, doubled-quote-escaped
/// MySQL string literals: `'a','b','c''c'` -> `["a", "b", "c'c"]`.
fn parse_quoted_value_list(inner: &str) -> Vec<String> {
    let mut values = Vec::new();
    let chars: Vec<char> = inner.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\'' {
            i += 1;
            let mut current = String::new();
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        current.push('\'');
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                current.push(chars[i]);
                i += 1;
            }
            values.push(current);
        } else {
            i += 1;
        }
    }
    values
}

/// A live index, grouped from `INFORMATION_SCHEMA.STATISTICS` rows,
/// preserving column (`SEQ_IN_INDEX`) order.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveIndex {
    pub name: String,
    pub fields: Vec<String>,
    pub unique: bool,
}

pub struct Introspector;

impl Introspector {
    /// Primary check via `SHOW TABLES`, fallback via a probe `SELECT`.
    pub async fn exists(pool: &MySqlPool, name: &str) -> EngineResult<bool> {
        let row = sqlx::query("SHOW TABLES LIKE ?").bind(name).fetch_optional(pool).await?;
        if row.is_some() {
            return Ok(true);
        }

        let probe = sqlx::query(&format!("SELECT 1 FROM `{}` LIMIT 1", name)).fetch_optional(pool).await;
        Ok(probe.is_ok())
    }

    pub async fn columns(pool: &MySqlPool, name: &str) -> EngineResult<Vec<LiveColumn>> {
        let rows = sqlx::query(
            "SELECT COLUMN_NAME, DATA_TYPE, COLUMN_TYPE, CHARACTER_MAXIMUM_LENGTH, \
                    NUMERIC_PRECISION, NUMERIC_SCALE, IS_NULLABLE, COLUMN_DEFAULT, \
                    COLUMN_KEY, EXTRA, COLUMN_COMMENT \
             FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
             ORDER BY ORDINAL_POSITION",
        )
        .bind(name)
        .fetch_all(pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(LiveColumn {
                    name: row.try_get("COLUMN_NAME")?,
                    data_type: row.try_get("DATA_TYPE")?,
                    column_type: row.try_get("COLUMN_TYPE")?,
                    length: row
                        .try_get::<Option<i64>, _>("CHARACTER_MAXIMUM_LENGTH")?
                        .map(|v| v as u32),
                    precision: row.try_get::<Option<i64>, _>("NUMERIC_PRECISION")?.map(|v| v as u32),
                    scale: row.try_get::<Option<i64>, _>("NUMERIC_SCALE")?.map(|v| v as u32),
                    nullable: row.try_get::<String, _>("IS_NULLABLE")? == "YES",
                    default_value: row.try_get("COLUMN_DEFAULT")?,
                    key_role: row.try_get("COLUMN_KEY")?,
                    extra: row.try_get("EXTRA")?,
                    comment: row.try_get("COLUMN_COMMENT")?,
                })
            })
            .collect()
    }

    pub async fn indexes(pool: &MySqlPool, name: &str) -> EngineResult<Vec<LiveIndex>> {
        let rows = sqlx::query(
            "SELECT INDEX_NAME, COLUMN_NAME, NON_UNIQUE, SEQ_IN_INDEX \
             FROM INFORMATION_SCHEMA.STATISTICS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND INDEX_NAME != 'PRIMARY' \
             ORDER BY INDEX_NAME, SEQ_IN_INDEX",
        )
        .bind(name)
        .fetch_all(pool)
        .await?;

        let mut grouped: BTreeMap<String, (bool, Vec<(i64, String)>)> = BTreeMap::new();
        for row in rows {
            let index_name: String = row.try_get("INDEX_NAME")?;
            let column_name: String = row.try_get("COLUMN_NAME")?;
            let non_unique: i64 = row.try_get("NON_UNIQUE")?;
            let seq: i64 = row.try_get("SEQ_IN_INDEX")?;
            let entry = grouped.entry(index_name).or_insert((non_unique == 0, Vec::new()));
            entry.1.push((seq, column_name));
        }

        Ok(grouped
            .into_iter()
            .map(|(name, (unique, mut cols))| {
                cols.sort_by_key(|(seq, _)| *seq);
                LiveIndex { name, fields: cols.into_iter().map(|(_, c)| c).collect(), unique }
            })
            .collect())
    }

    /// Diagnostic fallback.
    pub async fn show_create(pool: &MySqlPool, name: &str) -> EngineResult<String> {
        let row = sqlx::query(&format!("SHOW CREATE TABLE `{}`", name)).fetch_one(pool).await?;
        Ok(row.try_get("Create Table")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_enum() {
        assert_eq!(
            parse_quoted_value_list("'a','b','c'"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn parses_doubled_quote_escape() {
        assert_eq!(parse_quoted_value_list("'a','c''c'"), vec!["a".to_string(), "c'c".to_string()]);
    }

    #[test]
    fn enum_values_only_applies_to_enum_and_set() {
        let col = LiveColumn {
            name: "status".to_string(),
            data_type: "enum".to_string(),
            column_type: "enum('active','inactive')".to_string(),
            length: None,
            precision: None,
            scale: None,
            nullable: false,
            default_value: None,
            key_role: String::new(),
            extra: String::new(),
            comment: String::new(),
        };
        assert_eq!(col.enum_values(), Some(vec!["active".to_string(), "inactive".to_string()]));

        let not_enum = LiveColumn { column_type: "varchar(100)".to_string(), ..col };
        assert_eq!(not_enum.enum_values(), None);
    }

    #[test]
    fn primary_key_and_auto_increment_flags() {
        let col = LiveColumn {
            name: "id".to_string(),
            data_type: "int".to_string(),
            column_type: "int(11)".to_string(),
            length: None,
            precision: None,
            scale: None,
            nullable: false,
            default_value: None,
            key_role: "PRI".to_string(),
            extra: "auto_increment".to_string(),
            comment: String::new(),
        };
        assert!(col.is_primary_key());
        assert!(col.is_auto_increment());
    }
}
