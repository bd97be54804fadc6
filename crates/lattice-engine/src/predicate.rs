//! Filter predicates: one column compared against one literal.

use std::cmp::Ordering;
use std::fmt;

use lattice_common::Value;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::row::Row;

/// Comparison operator for predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// The operator's SQL spelling.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    fn evaluate(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A filter of the form `column <op> value`.
///
/// Evaluation is strict about kinds: comparing a row value against a
/// literal of a different kind is a type error for every operator,
/// equality included. A row that lacks the column simply does not match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    column: String,
    op: CompareOp,
    value: Value,
}

impl Predicate {
    /// Creates a predicate comparing `column` against `value`.
    pub fn new(column: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Self {
            column: column.into(),
            op,
            value,
        }
    }

    /// The filtered column.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// The comparison operator.
    #[must_use]
    pub fn op(&self) -> CompareOp {
        self.op
    }

    /// The literal being compared against.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether `row` satisfies the predicate.
    pub fn matches(&self, row: &Row) -> EngineResult<bool> {
        let Some(value) = row.get(&self.column) else {
            return Ok(false);
        };
        let ordering = value.try_compare(&self.value)?;
        Ok(self.op.evaluate(ordering))
    }

    /// A canonical text form that two predicates share exactly when they
    /// filter identically. The column is length-prefixed so its bytes
    /// cannot imitate the operator and value tail.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!(
            "{}:{} {} {}",
            self.column.len(),
            self.column,
            self.op.symbol(),
            self.value.fingerprint()
        )
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.op, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn row(age: i64) -> Row {
        Row::new().with("age", Value::int(age))
    }

    #[test]
    fn operators_evaluate_against_rows() {
        let cases = [
            (CompareOp::Eq, 30, true),
            (CompareOp::Eq, 31, false),
            (CompareOp::Ne, 31, true),
            (CompareOp::Lt, 31, true),
            (CompareOp::Lt, 30, false),
            (CompareOp::Le, 30, true),
            (CompareOp::Gt, 29, true),
            (CompareOp::Ge, 30, true),
            (CompareOp::Ge, 31, false),
        ];
        for (op, bound, expected) in cases {
            let predicate = Predicate::new("age", op, Value::int(bound));
            assert_eq!(
                predicate.matches(&row(30)).unwrap(),
                expected,
                "30 {op} {bound}"
            );
        }
    }

    #[test]
    fn rows_without_the_column_never_match() {
        let predicate = Predicate::new("age", CompareOp::Eq, Value::int(30));
        let bare = Row::new().with("name", Value::text("ada"));
        assert!(!predicate.matches(&bare).unwrap());
    }

    #[test]
    fn kind_mismatch_is_an_error_even_for_equality() {
        let predicate = Predicate::new("age", CompareOp::Eq, Value::text("30"));
        assert!(matches!(
            predicate.matches(&row(30)),
            Err(EngineError::TypeMismatch(_))
        ));
    }

    #[test]
    fn fingerprints_distinguish_literal_kinds() {
        let by_int = Predicate::new("x", CompareOp::Eq, Value::int(1)).fingerprint();
        let by_float = Predicate::new("x", CompareOp::Eq, Value::float(1.0)).fingerprint();
        let by_text = Predicate::new("x", CompareOp::Eq, Value::text("1")).fingerprint();

        assert_ne!(by_int, by_float);
        assert_ne!(by_int, by_text);
        assert_ne!(by_float, by_text);
    }

    #[test]
    fn fingerprints_are_deterministic() {
        let a = Predicate::new("price", CompareOp::Le, Value::float(9.5));
        let b = Predicate::new("price", CompareOp::Le, Value::float(9.5));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn column_bytes_cannot_imitate_the_tail() {
        // Without the length prefix both would render "x = text:a = text:b".
        let a = Predicate::new("x", CompareOp::Eq, Value::text("a = text:b")).fingerprint();
        let b = Predicate::new("x = text:a", CompareOp::Eq, Value::text("b")).fingerprint();
        assert_ne!(a, b);
    }
}
