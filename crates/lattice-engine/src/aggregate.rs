//! Whole-table aggregation over a single column.
//!
//! `sum` and `avg` are numeric and accumulate in `f64`, widening integer
//! inputs; `max` and `min` work on any single kind and return the value
//! in its native kind. Rows that lack the column contribute nothing, so
//! per-row field sets can differ freely.

use lattice_common::{TypeMismatchError, Value, ValueKind};

use crate::error::{EngineError, EngineResult};
use crate::table::Table;

/// Sums `column` across the table. An empty contribution set sums to 0.0.
pub fn sum(table: &Table, column: &str) -> EngineResult<f64> {
    fold_numeric(table, column).map(|(total, _)| total)
}

/// Arithmetic mean of `column` across the table.
///
/// Unlike the other aggregates, the mean of nothing has no usable
/// neutral value, so zero contributing rows is an error.
pub fn avg(table: &Table, column: &str) -> EngineResult<f64> {
    let (total, contributors) = fold_numeric(table, column)?;
    if contributors == 0 {
        return Err(EngineError::EmptyAggregation {
            function: "avg",
            column: column.to_owned(),
        });
    }
    Ok(total / contributors as f64)
}

/// Number of rows carrying `column`. An empty column name counts every
/// row, the `count(*)` form.
#[must_use]
pub fn count(table: &Table, column: &str) -> u64 {
    if column.is_empty() {
        return table.row_count() as u64;
    }
    table.iter().filter(|row| row.has_field(column)).count() as u64
}

/// Largest value of `column`, `None` when no row carries it.
pub fn max(table: &Table, column: &str) -> EngineResult<Option<Value>> {
    extreme(table, column, std::cmp::Ordering::Greater)
}

/// Smallest value of `column`, `None` when no row carries it.
pub fn min(table: &Table, column: &str) -> EngineResult<Option<Value>> {
    extreme(table, column, std::cmp::Ordering::Less)
}

/// Accumulates `column` as `f64`, returning the total and how many rows
/// contributed. Non-numeric values are a type error.
fn fold_numeric(table: &Table, column: &str) -> EngineResult<(f64, u64)> {
    let mut total = 0.0f64;
    let mut contributors = 0u64;
    for row in table.iter() {
        match row.get(column) {
            Some(Value::Int(v)) => total += *v as f64,
            Some(Value::Float(v)) => total += *v,
            Some(other) => {
                return Err(TypeMismatchError::new(ValueKind::Float, other.kind()).into());
            }
            None => continue,
        }
        contributors += 1;
    }
    Ok((total, contributors))
}

fn extreme(table: &Table, column: &str, keep: std::cmp::Ordering) -> EngineResult<Option<Value>> {
    let mut best: Option<Value> = None;
    for row in table.iter() {
        let Some(value) = row.get(column) else {
            continue;
        };
        match &best {
            Some(current) => {
                if value.try_compare(current)? == keep {
                    best = Some(value.clone());
                }
            }
            None => best = Some(value.clone()),
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;

    fn prices() -> Table {
        let mut table = Table::new("orders");
        for price in [10.50f64, 15.75, 10.50] {
            table
                .insert(Row::new().with("price", Value::float(price)))
                .unwrap();
        }
        table
    }

    #[test]
    fn float_aggregates_are_exact_on_representable_inputs() {
        let table = prices();
        assert_eq!(sum(&table, "price").unwrap(), 36.75);
        assert_eq!(count(&table, ""), 3);
        assert_eq!(avg(&table, "price").unwrap(), 12.25);
        assert_eq!(max(&table, "price").unwrap(), Some(Value::float(15.75)));
        assert_eq!(min(&table, "price").unwrap(), Some(Value::float(10.50)));
    }

    #[test]
    fn integers_widen_into_the_float_accumulator() {
        let mut table = Table::new("mixed");
        table.insert(Row::new().with("n", Value::int(2))).unwrap();
        table
            .insert(Row::new().with("n", Value::float(0.5)))
            .unwrap();
        assert_eq!(sum(&table, "n").unwrap(), 2.5);
        assert_eq!(avg(&table, "n").unwrap(), 1.25);
    }

    #[test]
    fn count_distinguishes_star_from_a_named_column() {
        let mut table = Table::new("mixed");
        table.insert(Row::new().with("a", Value::int(1))).unwrap();
        table.insert(Row::new().with("b", Value::int(2))).unwrap();
        table
            .insert(
                Row::new()
                    .with("a", Value::int(3))
                    .with("b", Value::int(4)),
            )
            .unwrap();

        assert_eq!(count(&table, ""), 3);
        assert_eq!(count(&table, "a"), 2);
        assert_eq!(count(&table, "b"), 2);
        assert_eq!(count(&table, "missing"), 0);
    }

    #[test]
    fn zero_rows_degrade_gracefully_except_for_avg() {
        let table = Table::new("empty");
        assert_eq!(sum(&table, "x").unwrap(), 0.0);
        assert_eq!(count(&table, "x"), 0);
        assert_eq!(max(&table, "x").unwrap(), None);
        assert_eq!(min(&table, "x").unwrap(), None);
        assert!(matches!(
            avg(&table, "x"),
            Err(EngineError::EmptyAggregation { function: "avg", .. })
        ));
    }

    #[test]
    fn avg_requires_contributing_rows_not_just_rows() {
        let mut table = Table::new("sparse");
        table.insert(Row::new().with("other", Value::int(1))).unwrap();
        assert!(matches!(
            avg(&table, "x"),
            Err(EngineError::EmptyAggregation { .. })
        ));
    }

    #[test]
    fn text_extremes_order_lexicographically() {
        let mut table = Table::new("tags");
        for tag in ["15.75", "10.50", "9"] {
            table
                .insert(Row::new().with("tag", Value::text(tag)))
                .unwrap();
        }
        // "9" sorts above both numeric-looking strings.
        assert_eq!(max(&table, "tag").unwrap(), Some(Value::text("9")));
        assert_eq!(min(&table, "tag").unwrap(), Some(Value::text("10.50")));
    }

    #[test]
    fn non_numeric_values_fail_numeric_aggregates() {
        let mut table = Table::new("bad");
        table
            .insert(Row::new().with("x", Value::text("nope")))
            .unwrap();
        assert!(matches!(
            sum(&table, "x"),
            Err(EngineError::TypeMismatch(_))
        ));
        assert!(matches!(
            avg(&table, "x"),
            Err(EngineError::TypeMismatch(_))
        ));
    }

    #[test]
    fn mixed_kinds_fail_extremes() {
        let mut table = Table::new("bad");
        table.insert(Row::new().with("x", Value::int(1))).unwrap();
        table
            .insert(Row::new().with("x", Value::text("two")))
            .unwrap();
        assert!(matches!(
            max(&table, "x"),
            Err(EngineError::TypeMismatch(_))
        ));
    }
}
