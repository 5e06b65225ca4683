//! Drift Detector (C7): compares a baseline MySQL instance against the
//! active catalog and proposes new/altered/dropped `TableSchema` versions.

use sqlx::{MySqlPool, Row};
use tracing::warn;

use crate::error::EngineResult;
use crate::introspect::{Introspector, LiveColumn};
use crate::model::{
    Column, ColumnType, DatabaseType, DefaultValue, Index, PartitionType, TableDefinition,
    TableDefinitionDto, TableSchema, TimeInterval,
};
use crate::reconcile::diff;
use crate::semver;

/// The parsed identity of a baseline table name: its logical name plus any
/// routing/partition markers encoded in the physical name.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBaselineName {
    pub logical_name: String,
    pub database_type: DatabaseType,
    pub partition_type: PartitionType,
    pub time_interval: Option<TimeInterval>,
}

/// Parse `name@log|order|static` routing and `#store|#time_day|#time_month|#time_year`
/// partition markers off a baseline table's physical name (spec §4.7).
pub fn parse_baseline_name(raw: &str) -> ParsedBaselineName {
    let (before_hash, partition_marker) = match raw.split_once('#') {
        Some((head, tail)) => (head, Some(tail)),
        None => (raw, None),
    };

    let (logical_name, database_type) = match before_hash.split_once('@') {
        Some((name, role)) => (name.to_string(), DatabaseType::parse(role).unwrap_or(DatabaseType::Main)),
        None => (before_hash.to_string(), DatabaseType::Main),
    };

    let (partition_type, time_interval) = match partition_marker {
        Some("store") => (PartitionType::Store, None),
        Some("time_day") => (PartitionType::Time, Some(TimeInterval::Day)),
        Some("time_month") => (PartitionType::Time, Some(TimeInterval::Month)),
        Some("time_year") => (PartitionType::Time, Some(TimeInterval::Year)),
        _ => (PartitionType::None, None),
    };

    ParsedBaselineName { logical_name, database_type, partition_type, time_interval }
}

/// A proposed change the drift detector wants persisted through the catalog.
#[derive(Debug, Clone)]
pub enum DriftProposal {
    NewTable(TableSchema),
    AlteredTable(TableSchema),
    DroppedTable(TableSchema),
}

pub struct DriftDetector;

impl DriftDetector {
    /// List all base tables in the baseline (`INFORMATION_SCHEMA.TABLES`,
    /// type `BASE TABLE`).
    pub async fn list_baseline_tables(baseline: &MySqlPool) -> EngineResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'",
        )
        .fetch_all(baseline)
        .await?;

        rows.into_iter().map(|row| Ok(row.try_get("TABLE_NAME")?)).collect()
    }

    /// Full detection sweep: classify every baseline table as new/existing,
    /// diff existing matches, and propose drops for catalog entries with no
    /// baseline match.
    pub async fn detect(
        baseline: &MySqlPool,
        active_catalog: &[TableSchema],
    ) -> EngineResult<Vec<DriftProposal>> {
        let baseline_names = Self::list_baseline_tables(baseline).await?;
        let mut proposals = Vec::new();
        let mut matched_catalog_keys = std::collections::HashSet::new();

        for raw_name in &baseline_names {
            let parsed = parse_baseline_name(raw_name);
            let existing = active_catalog.iter().find(|s| {
                (s.table_name == parsed.logical_name
                    && s.database_type == parsed.database_type
                    && s.partition_type == parsed.partition_type)
                    || (matches!(s.partition_type, PartitionType::Store | PartitionType::Time)
                        && matches_shard_of(raw_name, s))
            });

            match existing {
                Some(schema) => {
                    matched_catalog_keys.insert(schema.key());
                    if let Some(proposal) = Self::diff_existing(baseline, raw_name, schema).await? {
                        proposals.push(proposal);
                    }
                }
                None => {
                    let proposal = Self::propose_new_table(baseline, raw_name, &parsed).await?;
                    proposals.push(DriftProposal::NewTable(proposal));
                }
            }
        }

        for schema in active_catalog {
            if matched_catalog_keys.contains(&schema.key()) {
                continue;
            }
            if schema.definition().is_drop() {
                continue;
            }
            proposals.push(DriftProposal::DroppedTable(propose_drop(schema)));
        }

        Ok(proposals)
    }

    async fn diff_existing(
        baseline: &MySqlPool,
        physical_name: &str,
        schema: &TableSchema,
    ) -> EngineResult<Option<DriftProposal>> {
        let target = schema.definition();
        let (target_columns, target_indexes) = match &target {
            TableDefinition::Columns { columns, indexes, .. } => (columns.clone(), indexes.clone()),
            TableDefinition::Drop { .. } => return Ok(None),
        };

        let live_columns = Introspector::columns(baseline, physical_name).await?;
        let live_indexes = Introspector::indexes(baseline, physical_name).await?;

        let changed = !diff::phase_a_drop_columns(&live_columns, &target_columns).is_empty()
            || !diff::phase_b_add_columns(&live_columns, &target_columns).is_empty()
            || !diff::phase_c_modify_columns(&live_columns, &target_columns).is_empty();

        let index_diff = diff::phase_d_sync_indexes(&live_indexes, &target_columns, &target_indexes);
        let index_changed = !index_diff.to_drop.is_empty() || !index_diff.to_create.is_empty();

        if !changed && !index_changed {
            return Ok(None);
        }

        let new_version = semver::next_patch(&schema.schema_version, chrono::Utc::now().timestamp());
        let mut proposed = schema.clone();
        proposed.schema_version = new_version;
        proposed.changes_detected = Some("drift detected against baseline".to_string());
        proposed.schema_definition = synthesize_definition(physical_name, &schema.table_name, &live_columns, &live_indexes);

        Ok(Some(DriftProposal::AlteredTable(proposed)))
    }

    async fn propose_new_table(
        baseline: &MySqlPool,
        physical_name: &str,
        parsed: &ParsedBaselineName,
    ) -> EngineResult<TableSchema> {
        let live_columns = Introspector::columns(baseline, physical_name).await?;
        let live_indexes = Introspector::indexes(baseline, physical_name).await?;

        if infer_primary_key(&parsed.logical_name, &live_columns).is_none() {
            warn!(table = %physical_name, "primary key could not be inferred for new table");
        }

        let definition = synthesize_definition(physical_name, &parsed.logical_name, &live_columns, &live_indexes);

        Ok(TableSchema {
            id: 0,
            table_name: parsed.logical_name.clone(),
            database_type: parsed.database_type,
            partition_type: parsed.partition_type,
            time_interval: parsed.time_interval,
            time_format: parsed.time_interval.map(|t| t.default_format().to_string()),
            schema_version: "1.0.0".to_string(),
            schema_definition: definition,
            is_active: true,
            upgrade_notes: None,
            changes_detected: Some("new table detected in baseline".to_string()),
            created_at: chrono::Utc::now(),
        })
    }
}

fn propose_drop(schema: &TableSchema) -> TableSchema {
    let mut proposed = schema.clone();
    proposed.schema_definition = TableDefinitionDto::from(&TableDefinition::Drop { table_name: schema.table_name.clone() });
    proposed.changes_detected = Some("no longer present in baseline".to_string());
    proposed
}

/// Primary-key inference for new tables (spec §4.7): prefer
/// `<logical>_id` auto-increment integer; else the sole auto-increment
/// integer column; else a single `PRI`-keyed integer column whose name
/// contains "id"; else `None` (unresolved).
pub fn infer_primary_key<'a>(logical_name: &str, columns: &'a [LiveColumn]) -> Option<&'a LiveColumn> {
    let base = logical_name.strip_prefix("qc_").unwrap_or(logical_name);
    let preferred_name = format!("{}_id", base);

    if let Some(col) = columns.iter().find(|c| c.name == preferred_name && c.is_auto_increment() && is_integer_type(&c.data_type)) {
        return Some(col);
    }

    let auto_increment_ints: Vec<&LiveColumn> =
        columns.iter().filter(|c| c.is_auto_increment() && is_integer_type(&c.data_type)).collect();
    if auto_increment_ints.len() == 1 {
        return Some(auto_increment_ints[0]);
    }

    let pri_int_id_named: Vec<&LiveColumn> = columns
        .iter()
        .filter(|c| c.is_primary_key() && is_integer_type(&c.data_type) && c.name.to_ascii_lowercase().contains("id"))
        .collect();
    if pri_int_id_named.len() == 1 {
        return Some(pri_int_id_named[0]);
    }

    None
}

/// Spec §4.7 step 3's second classification clause: a baseline name with no
/// routing/partition marker of its own can still be *Existing* if it's an
/// already-materialized shard of a declared `Store`/`Time` base — e.g.
/// `orders_1001` against a `Store`-partitioned `orders`, or `logs_202412`
/// against a `Time`-partitioned `logs` with a monthly format.
fn matches_shard_of(physical_name: &str, schema: &TableSchema) -> bool {
    let Some(suffix) = physical_name.strip_prefix(&schema.table_name) else { return false };
    match schema.partition_type {
        PartitionType::Store => suffix.len() > 1 && suffix.starts_with('_'),
        PartitionType::Time => {
            let interval = schema.time_interval.unwrap_or(TimeInterval::Day);
            let format = schema.effective_time_format().unwrap_or(interval.default_format());
            shard_suffix_matches_format(suffix, format)
        }
        PartitionType::None => false,
    }
}

/// Match a shard suffix against a `time_format` token layout (`YYYY`/`MM`/`DD`
/// runs consume that many digits, everything else must match literally).
fn shard_suffix_matches_format(suffix: &str, format: &str) -> bool {
    let mut chars = format.chars().peekable();
    let mut rest = suffix;

    while let Some(c) = chars.next() {
        if c == 'Y' || c == 'M' || c == 'D' {
            let mut run_len = 1;
            while chars.peek() == Some(&c) {
                chars.next();
                run_len += 1;
            }
            if rest.len() < run_len || !rest[..run_len].bytes().all(|b| b.is_ascii_digit()) {
                return false;
            }
            rest = &rest[run_len..];
        } else if rest.starts_with(c) {
            rest = &rest[c.len_utf8()..];
        } else {
            return false;
        }
    }

    rest.is_empty()
}

fn is_integer_type(data_type: &str) -> bool {
    matches!(
        data_type.to_ascii_uppercase().as_str(),
        "INT" | "BIGINT" | "SMALLINT" | "TINYINT" | "MEDIUMINT"
    )
}

/// Build a `TableDefinitionDto` from a live introspected schema, used both
/// for new-table proposals and for re-synthesizing an altered table's
/// definition from the baseline's current structure.
fn synthesize_definition(
    physical_name: &str,
    logical_name: &str,
    live_columns: &[LiveColumn],
    live_indexes: &[crate::introspect::LiveIndex],
) -> TableDefinitionDto {
    let columns: Vec<Column> = live_columns
        .iter()
        .map(|lc| Column {
            name: lc.name.clone(),
            type_name: ColumnType::new(lc.data_type.clone()),
            length: lc.length,
            precision: lc.precision,
            scale: lc.scale,
            values: lc.enum_values(),
            allow_null: Some(lc.nullable),
            default_value: lc.default_value.as_deref().map(DefaultValue::parse),
            primary_key: lc.is_primary_key() || infer_primary_key(logical_name, live_columns).map(|c| c.name == lc.name).unwrap_or(false),
            auto_increment: lc.is_auto_increment(),
            unique: lc.key_role == "UNI",
            comment: if lc.comment.is_empty() { None } else { Some(lc.comment.clone()) },
        })
        .collect();

    let indexes: Vec<Index> =
        live_indexes.iter().map(|li| Index { name: li.name.clone(), fields: li.fields.clone(), unique: li.unique }).collect();

    TableDefinitionDto::from(&TableDefinition::Columns { table_name: physical_name.to_string(), columns, indexes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_role_and_store_marker() {
        let parsed = parse_baseline_name("orders@order#store");
        assert_eq!(parsed.logical_name, "orders");
        assert_eq!(parsed.database_type, DatabaseType::Order);
        assert_eq!(parsed.partition_type, PartitionType::Store);
    }

    #[test]
    fn defaults_to_main_and_none_partition() {
        let parsed = parse_baseline_name("users");
        assert_eq!(parsed.database_type, DatabaseType::Main);
        assert_eq!(parsed.partition_type, PartitionType::None);
    }

    #[test]
    fn parses_time_marker_without_role() {
        let parsed = parse_baseline_name("events#time_month");
        assert_eq!(parsed.logical_name, "events");
        assert_eq!(parsed.database_type, DatabaseType::Main);
        assert_eq!(parsed.partition_type, PartitionType::Time);
        assert_eq!(parsed.time_interval, Some(TimeInterval::Month));
    }

    fn sharded_schema(table_name: &str, partition_type: PartitionType, time_interval: Option<TimeInterval>) -> TableSchema {
        TableSchema {
            id: 1,
            table_name: table_name.to_string(),
            database_type: DatabaseType::Main,
            partition_type,
            time_interval,
            time_format: None,
            schema_version: "1.0.0".to_string(),
            schema_definition: TableDefinitionDto { table_name: table_name.to_string(), action: None, columns: vec![], indexes: vec![] },
            is_active: true,
            upgrade_notes: None,
            changes_detected: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn store_shard_name_matches_its_declared_base() {
        let schema = sharded_schema("orders", PartitionType::Store, None);
        assert!(matches_shard_of("orders_1001", &schema));
        assert!(!matches_shard_of("orders", &schema));
        assert!(!matches_shard_of("ordersextra", &schema));
    }

    #[test]
    fn time_shard_name_matches_default_monthly_format() {
        let schema = sharded_schema("logs", PartitionType::Time, Some(TimeInterval::Month));
        assert!(matches_shard_of("logs_202412", &schema));
        assert!(!matches_shard_of("logs_2024", &schema));
        assert!(!matches_shard_of("logs_abcdef", &schema));
    }

    #[test]
    fn time_shard_name_matches_custom_format() {
        let mut schema = sharded_schema("events", PartitionType::Time, Some(TimeInterval::Day));
        schema.time_format = Some("_YYYY_MM_DD".to_string());
        assert!(matches_shard_of("events_2026_07_27", &schema));
        assert!(!matches_shard_of("events_20260727", &schema));
    }

    #[test]
    fn unrelated_name_does_not_match_a_different_base() {
        let schema = sharded_schema("orders", PartitionType::Store, None);
        assert!(!matches_shard_of("invoices_1001", &schema));
    }

    fn int_col(name: &str, auto_increment: bool, pri: bool) -> LiveColumn {
        LiveColumn {
            name: name.to_string(),
            data_type: "int".to_string(),
            column_type: "int(11)".to_string(),
            length: None,
            precision: None,
            scale: None,
            nullable: false,
            default_value: None,
            key_role: if pri { "PRI".to_string() } else { String::new() },
            extra: if auto_increment { "auto_increment".to_string() } else { String::new() },
            comment: String::new(),
        }
    }

    #[test]
    fn infers_pk_by_preferred_name() {
        let columns = vec![int_col("orders_id", true, true), int_col("other", true, false)];
        let pk = infer_primary_key("orders", &columns);
        assert_eq!(pk.unwrap().name, "orders_id");
    }

    #[test]
    fn infers_pk_by_sole_auto_increment() {
        let columns = vec![int_col("surrogate", true, true), int_col("count", false, false)];
        let pk = infer_primary_key("orders", &columns);
        assert_eq!(pk.unwrap().name, "surrogate");
    }

    #[test]
    fn infers_pk_by_pri_id_named_column() {
        let columns = vec![int_col("record_id", false, true), int_col("count", false, false)];
        let pk = infer_primary_key("orders", &columns);
        assert_eq!(pk.unwrap().name, "record_id");
    }

    #[test]
    fn leaves_unresolved_when_ambiguous() {
        let columns = vec![int_col("a", true, false), int_col("b", true, false)];
        assert!(infer_primary_key("orders", &columns).is_none());
    }
}
