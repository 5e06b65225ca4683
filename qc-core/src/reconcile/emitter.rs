//! DDL emitter: centralizes identifier quoting, type-string formatting, and
//! default-value sentinel handling so the reconcile phases never splice SQL
//! strings inline (spec §9).

use crate::model::{Column, DefaultValue, Index, TableDefinition, LENGTH_SUPPRESSED_TYPES};

pub struct Emitter;

impl Emitter {
    pub fn quote_ident(name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn quote_literal(value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Full column definition clause: `` `name` TYPE(len) NOT NULL DEFAULT ... COMMENT '...' ``.
    pub fn column_clause(column: &Column) -> String {
        let mut clause = format!("{} {}", Self::quote_ident(&column.name), Self::type_clause(column));

        if !column.effective_allow_null() {
            clause.push_str(" NOT NULL");
        } else {
            clause.push_str(" NULL");
        }

        if let Some(default) = &column.default_value {
            clause.push_str(" DEFAULT ");
            clause.push_str(&Self::default_clause(default));
        }

        if column.auto_increment {
            clause.push_str(" AUTO_INCREMENT");
        }

        if column.unique && !column.primary_key {
            clause.push_str(" UNIQUE");
        }

        if let Some(comment) = &column.comment {
            if !comment.is_empty() {
                clause.push_str(" COMMENT ");
                clause.push_str(&Self::quote_literal(comment));
            }
        }

        clause
    }

    /// The bare type clause (no nullability/default): `VARCHAR(100)`,
    /// `DECIMAL(10,2)`, `ENUM('a','b')`, `TEXT` (length suppressed).
    fn type_clause(column: &Column) -> String {
        let normalized = column.type_name.normalized();

        if normalized == "ENUM" || normalized == "SET" {
            let values = column
                .values
                .as_ref()
                .map(|vs| vs.iter().map(|v| Self::quote_literal(v)).collect::<Vec<_>>().join(","))
                .unwrap_or_default();
            return format!("{}({})", normalized, values);
        }

        if LENGTH_SUPPRESSED_TYPES.contains(&normalized.as_str()) {
            return normalized;
        }

        if normalized == "DECIMAL" || normalized == "NUMERIC" {
            return match (column.precision, column.scale) {
                (Some(p), Some(s)) => format!("{}({},{})", normalized, p, s),
                (Some(p), None) => format!("{}({})", normalized, p),
                _ => normalized,
            };
        }

        match column.length {
            Some(len) => format!("{}({})", normalized, len),
            None => normalized,
        }
    }

    fn default_clause(default: &DefaultValue) -> String {
        match default {
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
            DefaultValue::CurrentTimestampOnUpdate => {
                "CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP".to_string()
            }
            DefaultValue::Literal(v) => Self::quote_literal(v),
        }
    }

    /// Full `CREATE TABLE` for a table that does not yet exist.
    pub fn create_table(definition: &TableDefinition) -> Option<String> {
        match definition {
            TableDefinition::Drop { .. } => None,
            TableDefinition::Columns { table_name, columns, indexes } => {
                let mut clauses: Vec<String> = columns.iter().map(Self::column_clause).collect();

                let pk_columns: Vec<&str> = columns.iter().filter(|c| c.primary_key).map(|c| c.name.as_str()).collect();
                if !pk_columns.is_empty() {
                    let pk_idents = pk_columns.iter().map(|c| Self::quote_ident(c)).collect::<Vec<_>>().join(", ");
                    clauses.push(format!("PRIMARY KEY ({})", pk_idents));
                }

                for index in Self::deduplicated_indexes(columns, indexes) {
                    clauses.push(Self::index_clause_inline(index));
                }

                Some(format!(
                    "CREATE TABLE {} (\n  {}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
                    Self::quote_ident(table_name),
                    clauses.join(",\n  ")
                ))
            }
        }
    }

    pub fn drop_table(table_name: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", Self::quote_ident(table_name))
    }

    pub fn drop_column(table_name: &str, column_name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            Self::quote_ident(table_name),
            Self::quote_ident(column_name)
        )
    }

    pub fn add_column(table_name: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            Self::quote_ident(table_name),
            Self::column_clause(column)
        )
    }

    pub fn modify_column(table_name: &str, column: &Column) -> String {
        format!(
            "ALTER TABLE {} MODIFY COLUMN {}",
            Self::quote_ident(table_name),
            Self::column_clause(column)
        )
    }

    pub fn drop_index(table_name: &str, index_name: &str) -> String {
        format!(
            "DROP INDEX {} ON {}",
            Self::quote_ident(index_name),
            Self::quote_ident(table_name)
        )
    }

    pub fn create_index(table_name: &str, index: &Index) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        let fields = index.fields.iter().map(|f| Self::quote_ident(f)).collect::<Vec<_>>().join(", ");
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            Self::quote_ident(&index.name),
            Self::quote_ident(table_name),
            fields
        )
    }

    fn index_clause_inline(index: &Index) -> String {
        let kind = if index.unique { "UNIQUE KEY" } else { "KEY" };
        let fields = index.fields.iter().map(|f| Self::quote_ident(f)).collect::<Vec<_>>().join(", ");
        format!("{} {} ({})", kind, Self::quote_ident(&index.name), fields)
    }

    /// Single-column uniqueness already carried by a column's `unique`
    /// attribute must not also appear as a separate unique index.
    pub fn deduplicated_indexes<'a>(columns: &[Column], indexes: &'a [Index]) -> Vec<&'a Index> {
        let single_unique_cols: Vec<&str> = columns
            .iter()
            .filter(|c| c.unique || c.primary_key)
            .map(|c| c.name.as_str())
            .collect();

        indexes
            .iter()
            .filter(|idx| {
                !(idx.fields.len() == 1 && idx.unique && single_unique_cols.contains(&idx.fields[0].as_str()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnType;

    fn col(name: &str, type_name: &str) -> Column {
        Column {
            name: name.to_string(),
            type_name: ColumnType::new(type_name),
            length: None,
            precision: None,
            scale: None,
            values: None,
            allow_null: None,
            default_value: None,
            primary_key: false,
            auto_increment: false,
            unique: false,
            comment: None,
        }
    }

    #[test]
    fn suppresses_length_for_text_types() {
        let mut c = col("body", "TEXT");
        c.length = Some(1000);
        assert_eq!(Emitter::type_clause(&c), "TEXT");
    }

    #[test]
    fn decimal_keeps_precision_and_scale() {
        let mut c = col("amount", "DECIMAL");
        c.precision = Some(10);
        c.scale = Some(2);
        assert_eq!(Emitter::type_clause(&c), "DECIMAL(10,2)");
    }

    #[test]
    fn enum_type_renders_quoted_values() {
        let mut c = col("status", "ENUM");
        c.values = Some(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(Emitter::type_clause(&c), "ENUM('a','b')");
    }

    #[test]
    fn not_null_clause_uses_effective_allow_null() {
        let mut c = col("email", "VARCHAR");
        c.length = Some(100);
        c.allow_null = Some(false);
        assert!(Emitter::column_clause(&c).contains("NOT NULL"));
    }

    #[test]
    fn current_timestamp_sentinel_is_unquoted() {
        let mut c = col("created_at", "TIMESTAMP");
        c.default_value = Some(DefaultValue::CurrentTimestamp);
        assert!(Emitter::column_clause(&c).contains("DEFAULT CURRENT_TIMESTAMP"));
        assert!(!Emitter::column_clause(&c).contains("'CURRENT_TIMESTAMP'"));
    }

    #[test]
    fn literal_default_is_quoted() {
        let mut c = col("status", "VARCHAR");
        c.length = Some(20);
        c.default_value = Some(DefaultValue::Literal("active".to_string()));
        assert!(Emitter::column_clause(&c).contains("DEFAULT 'active'"));
    }

    #[test]
    fn dedup_skips_single_column_unique_index_duplicating_column_flag() {
        let mut c = col("email", "VARCHAR");
        c.length = Some(100);
        c.unique = true;
        let columns = vec![c];
        let indexes = vec![Index { name: "idx_email".to_string(), fields: vec!["email".to_string()], unique: true }];
        assert!(Emitter::deduplicated_indexes(&columns, &indexes).is_empty());
    }
}
