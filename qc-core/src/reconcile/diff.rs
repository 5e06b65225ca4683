//! Pure structural diffing for the Reconciliation Engine's four ordered
//! phases (spec §4.5). Kept independent of SQL execution so it can be unit
//! tested against plain structs.

use crate::introspect::{LiveColumn, LiveIndex};
use crate::model::{Column, Index};
use crate::reconcile::emitter::Emitter;

/// Columns to drop in Phase A: live columns absent from target, excluding
/// primary-key columns (never auto-dropped).
pub fn phase_a_drop_columns<'a>(live: &'a [LiveColumn], target: &[Column]) -> Vec<&'a LiveColumn> {
    live.iter()
        .filter(|lc| !lc.is_primary_key())
        .filter(|lc| !target.iter().any(|tc| tc.name == lc.name))
        .collect()
}

/// Columns to add in Phase B: target columns absent from live.
pub fn phase_b_add_columns<'a>(live: &[LiveColumn], target: &'a [Column]) -> Vec<&'a Column> {
    target.iter().filter(|tc| !live.iter().any(|lc| lc.name == tc.name)).collect()
}

/// Columns to modify in Phase C: present in both, with a normalized
/// attribute diff (spec §4.5 normalization rules).
pub fn phase_c_modify_columns<'a>(live: &[LiveColumn], target: &'a [Column]) -> Vec<&'a Column> {
    target
        .iter()
        .filter_map(|tc| {
            let lc = live.iter().find(|lc| lc.name == tc.name)?;
            if column_differs(lc, tc) {
                Some(tc)
            } else {
                None
            }
        })
        .collect()
}

fn column_differs(live: &LiveColumn, target: &Column) -> bool {
    let live_type_normalized = match live.column_type.find('(') {
        Some(idx) => live.column_type[..idx].trim().to_ascii_uppercase(),
        None => live.column_type.trim().to_ascii_uppercase(),
    };
    if live_type_normalized != target.type_name.normalized() {
        return true;
    }

    let live_not_null = !live.nullable;
    let target_not_null = !target.effective_allow_null();
    if live_not_null != target_not_null {
        return true;
    }

    if let Some(target_default) = &target.default_value {
        let live_default = live.default_value.as_deref().unwrap_or("").trim().to_string();
        if live_default != target_default.comparable() {
            return true;
        }
    }

    let live_comment = live.comment.trim();
    if live_comment != target.comment_comparable() {
        return true;
    }

    if let Some(target_values) = &target.values {
        let live_values = live.enum_values().unwrap_or_default();
        if &live_values != target_values {
            return true;
        }
    }

    if target.precision.is_some() && live.precision != target.precision {
        return true;
    }
    if target.scale.is_some() && live.scale != target.scale {
        return true;
    }

    false
}

/// Phase D: indexes to drop (live, not in target) and create (target, not in
/// live), after deduplicating target indexes already covered by a column's
/// `unique` attribute.
pub struct IndexDiff<'a> {
    pub to_drop: Vec<&'a LiveIndex>,
    pub to_create: Vec<&'a Index>,
}

pub fn phase_d_sync_indexes<'a>(
    live: &'a [LiveIndex],
    target_columns: &[Column],
    target_indexes: &'a [Index],
) -> IndexDiff<'a> {
    let deduped = Emitter::deduplicated_indexes(target_columns, target_indexes);

    let to_drop = live.iter().filter(|li| !deduped.iter().any(|ti| ti.name == li.name)).collect();

    let to_create = deduped.into_iter().filter(|ti| !live.iter().any(|li| li.name == ti.name)).collect();

    IndexDiff { to_drop, to_create }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnType;

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

    #[test]
    fn phase_a_never_drops_primary_key() {
        let live = vec![live_col("id", "INT", false, true), live_col("legacy", "VARCHAR", true, false)];
        let target = vec![target_col("id", "INT")];
        let dropped = phase_a_drop_columns(&live, &target);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].name, "legacy");
    }

    #[test]
    fn phase_b_finds_missing_target_columns() {
        let live = vec![live_col("id", "INT", false, true)];
        let target = vec![target_col("id", "INT"), target_col("phone", "VARCHAR")];
        let added = phase_b_add_columns(&live, &target);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].name, "phone");
    }

    #[test]
    fn phase_c_is_empty_when_nothing_changed() {
        let live = vec![live_col("id", "INT", false, true)];
        let mut target = target_col("id", "INT");
        target.allow_null = Some(false);
        let modified = phase_c_modify_columns(&live, &[target]);
        assert!(modified.is_empty());
    }

    #[test]
    fn phase_c_detects_nullability_change() {
        let live = vec![live_col("email", "VARCHAR", false, false)];
        let target = target_col("email", "VARCHAR");
        let modified = phase_c_modify_columns(&live, &[target]);
        assert_eq!(modified.len(), 1);
    }

    #[test]
    fn phase_d_drops_unmatched_live_and_creates_unmatched_target() {
        let live = vec![LiveIndex { name: "idx_old".to_string(), fields: vec!["x".to_string()], unique: false }];
        let target_indexes = vec![Index { name: "idx_new".to_string(), fields: vec!["y".to_string()], unique: false }];
        let diff = phase_d_sync_indexes(&live, &[], &target_indexes);
        assert_eq!(diff.to_drop.len(), 1);
        assert_eq!(diff.to_create.len(), 1);
    }
}
