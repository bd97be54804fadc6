//! Equality joins between two tables.
//!
//! Two algorithms, one contract: [`hash_join`] and [`merge_join`] return
//! the same multiset of joined rows for the same inputs. Both are inner
//! joins on one column per side; rows missing their join column sit out,
//! and unmatched rows are dropped. Joined rows carry the left row's fields
//! followed by the right row's, with colliding right field names qualified
//! as `<right_table>.<name>`.

use std::cmp::Ordering;
use std::collections::HashMap;

use lattice_common::{TypeMismatchError, Value, ValueKind};

use crate::error::EngineResult;
use crate::row::Row;
use crate::table::Table;

/// Joins `left` and `right` where `left_column` equals `right_column`,
/// building a hash multimap over the right table and probing it with each
/// left row in append order.
pub fn hash_join(
    left: &Table,
    right: &Table,
    left_column: &str,
    right_column: &str,
) -> EngineResult<Vec<Row>> {
    check_key_kinds(left, right, left_column, right_column)?;

    let mut build: HashMap<&Value, Vec<&Row>> = HashMap::new();
    for row in right.iter() {
        if let Some(key) = row.get(right_column) {
            build.entry(key).or_default().push(row);
        }
    }

    let mut results = Vec::new();
    for row in left.iter() {
        let Some(key) = row.get(left_column) else {
            continue;
        };
        if let Some(matches) = build.get(key) {
            for matched in matches {
                results.push(merge_rows(row, matched, right.name()));
            }
        }
    }
    Ok(results)
}

/// Joins `left` and `right` where `left_column` equals `right_column` by
/// sorting both sides on the join key and merging, emitting the cross
/// product of each equal-key run.
pub fn merge_join(
    left: &Table,
    right: &Table,
    left_column: &str,
    right_column: &str,
) -> EngineResult<Vec<Row>> {
    check_key_kinds(left, right, left_column, right_column)?;

    let left_sorted = sorted_on(left, left_column);
    let right_sorted = sorted_on(right, right_column);

    let mut results = Vec::new();
    let mut i = 0;
    let mut j = 0;
    while i < left_sorted.len() && j < right_sorted.len() {
        let (left_key, _) = left_sorted[i];
        let (right_key, _) = right_sorted[j];
        match left_key.try_compare(right_key)? {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                // The whole run of equal keys on each side joins pairwise.
                let run_start = j;
                while i < left_sorted.len() && left_sorted[i].0 == left_key {
                    let mut k = run_start;
                    while k < right_sorted.len() && right_sorted[k].0 == left_key {
                        results.push(merge_rows(left_sorted[i].1, right_sorted[k].1, right.name()));
                        k += 1;
                    }
                    i += 1;
                }
                while j < right_sorted.len() && right_sorted[j].0 == left_key {
                    j += 1;
                }
            }
        }
    }
    Ok(results)
}

/// Verifies that every join-key value across both tables carries one kind,
/// so both algorithms reject mixed inputs identically before doing any
/// work.
fn check_key_kinds(
    left: &Table,
    right: &Table,
    left_column: &str,
    right_column: &str,
) -> Result<(), TypeMismatchError> {
    let mut kind: Option<ValueKind> = None;
    let keys = left
        .iter()
        .filter_map(|row| row.get(left_column))
        .chain(right.iter().filter_map(|row| row.get(right_column)));
    for key in keys {
        match kind {
            Some(expected) if expected != key.kind() => {
                return Err(TypeMismatchError::new(expected, key.kind()));
            }
            _ => kind = Some(key.kind()),
        }
    }
    Ok(())
}

/// Live rows carrying `column`, sorted ascending on its value. Stable, so
/// equal-key rows keep their append order.
fn sorted_on<'a>(table: &'a Table, column: &str) -> Vec<(&'a Value, &'a Row)> {
    let mut rows: Vec<(&Value, &Row)> = table
        .iter()
        .filter_map(|row| row.get(column).map(|key| (key, row)))
        .collect();
    // Kinds were validated up front, so comparison within the slice is
    // total and the fallback ordering is unreachable.
    rows.sort_by(|(a, _), (b, _)| a.compare(b).unwrap_or(Ordering::Equal));
    rows
}

/// Concatenates a matched pair into one output row. Left fields come
/// first, verbatim; a right field whose name is already taken is stored
/// qualified by the right table's name.
fn merge_rows(left: &Row, right: &Row, right_table: &str) -> Row {
    let mut merged = left.clone();
    for (name, value) in right.iter() {
        if merged.has_field(name) {
            merged.set(format!("{right_table}.{name}"), value.clone());
        } else {
            merged.set(name, value.clone());
        }
    }
    merged
}
