//! Positional schema diffing.
//!
//! Compares two sample-row schemas index by index and emits a
//! [`Descriptor`] entry for every column whose physical encoding changed.
//! Before diffing, a disambiguation pass resolves type guesses using the
//! cross-version signal: a later `Text` sample overrides an earlier
//! numeric-looking guess, and a whole-integer "numeric" pair with no
//! observed decimals on either side is too ambiguous to assert and is
//! demoted to `Unknown`. The pass works on copies; the input schemas are
//! never mutated.

use crate::{
    classify::ColumnType,
    descriptor::{ChangeKind, ColumnChange, Descriptor, StripSide},
    schema::{Column, Schema},
};

/// Outcome of diffing two schemas.
#[derive(Debug)]
pub struct DiffReport {
    /// Executable change entries, one per differing column, ordered by
    /// ordinal. Columns without changes are omitted; the transform stage
    /// back-fills `none` entries to full coverage.
    pub descriptor: Descriptor,
    /// Old-schema columns whose resolved type is still `Unknown` after the
    /// disambiguation pass. Informational, for operator review; not part of
    /// the executable descriptor.
    pub unknown_columns: Vec<Column>,
}

/// Diffs `old` against `new`, pairing columns strictly by position.
///
/// Indices present in only one schema have no counterpart and are not
/// diffed; reordered or renamed columns are out of scope by design.
pub fn diff(old: &Schema, new: &Schema) -> DiffReport {
    let mut entries = Vec::new();
    let mut unknown_columns = Vec::new();

    for (old_column, new_column) in old.columns.iter().zip(&new.columns) {
        let (old_type, new_type) = resolve_types(old_column, new_column);

        if old_type == ColumnType::Unknown {
            let mut resolved = old_column.clone();
            resolved.column_type = old_type;
            unknown_columns.push(resolved);
        }

        let size_changed = old_column.size != new_column.size;
        // A Num=>Num pair always counts as a type change: the coarse label
        // matches but the decimal layout may not.
        let type_changed =
            old_type != new_type || (old_type == ColumnType::Num && new_type == ColumnType::Num);
        let decs_changed = old_column.decimal_count != new_column.decimal_count;
        let new_is_numeric = matches!(new_type, ColumnType::Num | ColumnType::NumPacked4);

        if !(type_changed || size_changed || (decs_changed && new_is_numeric)) {
            continue;
        }

        let mut kinds = Vec::new();
        if size_changed {
            kinds.push(ChangeKind::Size);
        }
        if decs_changed && new_is_numeric {
            kinds.push(ChangeKind::NbDecs);
        }
        if type_changed {
            kinds.push(ChangeKind::Type);
        }

        let strip = (old_type == ColumnType::Text && new_type == ColumnType::Text && size_changed)
            // No signal in one sample tells us which side to truncate;
            // right is the documented default for hand-edit overrides.
            .then_some(StripSide::Right);
        let decs_change =
            new_is_numeric.then_some((old_column.decimal_count, new_column.decimal_count));

        entries.push(ColumnChange {
            ordinal: old_column.ordinal,
            kinds,
            type_change: Some((old_type, new_type)),
            size_change: Some((old_column.size, new_column.size)),
            decs_change,
            strip,
            move_before: None,
            move_after: None,
        });
    }

    DiffReport {
        descriptor: Descriptor::new(entries),
        unknown_columns,
    }
}

/// The disambiguation pass for one column pair; returns working copies of
/// the two types, leaving the schemas untouched.
fn resolve_types(old: &Column, new: &Column) -> (ColumnType, ColumnType) {
    let mut old_type = old.column_type;
    let mut new_type = new.column_type;

    // A later, longer sample showing free text overrides an earlier
    // numeric-looking guess.
    if new_type == ColumnType::Text {
        old_type = ColumnType::Text;
    }
    if new_type == ColumnType::Unknown && old_type == ColumnType::Text {
        new_type = ColumnType::Text;
    }
    // Whole-integer numerics with no decimals on either side are undetermined.
    if old_type == ColumnType::Num
        && new_type == ColumnType::Num
        && old.decimal_count < 1
        && new.decimal_count < 1
    {
        old_type = ColumnType::Unknown;
        new_type = ColumnType::Unknown;
    }

    (old_type, new_type)
}
