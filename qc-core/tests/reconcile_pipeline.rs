//! Exercises the Reconciliation Engine's four diff phases together against a
//! single simulated schema evolution, rather than one phase at a time.

use qc_core::introspect::{LiveColumn, LiveIndex};
use qc_core::model::{Column, ColumnType, Index};
use qc_core::reconcile::diff::{phase_a_drop_columns, phase_b_add_columns, phase_c_modify_columns, phase_d_sync_indexes};

fn live_col(name: &str, data_type: &str, nullable: bool, pk: bool) -> LiveColumn {
    LiveColumn {
        name: name.to_string(),
        data_type: data_type.to_string(),
        column_type: data_type.to_string(),
        length: None,
        precision: None,
        scale: None,
        nullable,
        default_value: None,
        key_role: if pk { "PRI".to_string() } else { String::new() },
        extra: String::new(),
        comment: String::new(),
    }
}

fn target_col(name: &str, type_name: &str) -> Column {
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

/// Simulates a table that has accumulated drift since it was first created:
/// a legacy column still lives in prod, a new nullable column needs adding, an
/// existing column changed type, and the index set was rebalanced. Verifies
/// the four phases, run in spec order, together produce exactly the expected
/// reconciliation plan.
#[test]
fn full_evolution_produces_expected_four_phase_plan() {
    let live_columns = vec![
        live_col("id", "INT", false, true),
        live_col("legacy_flag", "TINYINT", true, false),
        live_col("email", "VARCHAR", false, false),
    ];
    let live_indexes =
        vec![LiveIndex { name: "idx_legacy".to_string(), fields: vec!["legacy_flag".to_string()], unique: false }];

    let mut id_col = target_col("id", "INT");
    id_col.allow_null = Some(false);
    let target_columns = vec![id_col, target_col("email", "TEXT"), target_col("phone", "VARCHAR")];
    let target_indexes =
        vec![Index { name: "idx_phone".to_string(), fields: vec!["phone".to_string()], unique: false }];

    let dropped = phase_a_drop_columns(&live_columns, &target_columns);
    assert_eq!(dropped.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["legacy_flag"]);

    let added = phase_b_add_columns(&live_columns, &target_columns);
    assert_eq!(added.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["phone"]);

    let modified = phase_c_modify_columns(&live_columns, &target_columns);
    assert_eq!(modified.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["email"]);

    let index_diff = phase_d_sync_indexes(&live_indexes, &target_columns, &target_indexes);
    assert_eq!(index_diff.to_drop.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(), vec!["idx_legacy"]);
    assert_eq!(index_diff.to_create.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(), vec!["idx_phone"]);
}

#[test]
fn already_converged_schema_produces_no_plan() {
    let live_columns = vec![live_col("id", "INT", false, true), live_col("name", "VARCHAR", true, false)];
    let live_indexes = vec![LiveIndex { name: "idx_name".to_string(), fields: vec!["name".to_string()], unique: false }];

    let mut id_col = target_col("id", "INT");
    id_col.allow_null = Some(false);
    let target_columns = vec![id_col, target_col("name", "VARCHAR")];
    let target_indexes = vec![Index { name: "idx_name".to_string(), fields: vec!["name".to_string()], unique: false }];

    assert!(phase_a_drop_columns(&live_columns, &target_columns).is_empty());
    assert!(phase_b_add_columns(&live_columns, &target_columns).is_empty());
    assert!(phase_c_modify_columns(&live_columns, &target_columns).is_empty());

    let index_diff = phase_d_sync_indexes(&live_indexes, &target_columns, &target_indexes);
    assert!(index_diff.to_drop.is_empty());
    assert!(index_diff.to_create.is_empty());
}
