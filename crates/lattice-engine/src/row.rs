//! Rows: ordered collections of named values.

use std::fmt;

use lattice_common::{TypeMismatchError, Value, ValueKind};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A single record: named fields in insertion order.
///
/// Rows are schemaless. Two rows in the same table may carry different
/// field sets, and a field's kind is not pinned across rows. Field order
/// is remembered for display purposes but ignored by equality.
///
/// ```
/// use lattice_engine::{Row, Value};
///
/// let row = Row::new()
///     .with("id", Value::int(1))
///     .with("name", Value::text("ada"));
/// assert_eq!(row.get_int("id").unwrap(), 1);
/// assert_eq!(row.get_text("name").unwrap(), "ada");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, overwriting in place when the field exists
    /// so its position in the row is preserved.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// The value of `name`, if the field exists.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Whether the row carries a field called `name`.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn require(&self, name: &str) -> EngineResult<&Value> {
        self.get(name)
            .ok_or_else(|| EngineError::FieldNotFound(name.to_owned()))
    }

    /// The integer stored under `name`.
    pub fn get_int(&self, name: &str) -> EngineResult<i64> {
        match self.require(name)? {
            Value::Int(v) => Ok(*v),
            other => Err(TypeMismatchError::new(ValueKind::Int, other.kind()).into()),
        }
    }

    /// The float stored under `name`.
    pub fn get_float(&self, name: &str) -> EngineResult<f64> {
        match self.require(name)? {
            Value::Float(v) => Ok(*v),
            other => Err(TypeMismatchError::new(ValueKind::Float, other.kind()).into()),
        }
    }

    /// The boolean stored under `name`.
    pub fn get_bool(&self, name: &str) -> EngineResult<bool> {
        match self.require(name)? {
            Value::Bool(v) => Ok(*v),
            other => Err(TypeMismatchError::new(ValueKind::Bool, other.kind()).into()),
        }
    }

    /// The text stored under `name`.
    pub fn get_text(&self, name: &str) -> EngineResult<&str> {
        match self.require(name)? {
            Value::Text(v) => Ok(v.as_str()),
            other => Err(TypeMismatchError::new(ValueKind::Text, other.kind()).into()),
        }
    }

    /// Iterates over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Field order does not matter: two rows are equal when they hold the
/// same fields with equal values.
impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .all(|(name, value)| other.get(name) == Some(value))
    }
}

impl Eq for Row {}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (position, (name, value)) in self.fields.iter().enumerate() {
            if position > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_in_place() {
        let mut row = Row::new()
            .with("a", Value::int(1))
            .with("b", Value::int(2));
        row.set("a", Value::text("replaced"));

        assert_eq!(row.len(), 2);
        assert_eq!(row.get("a"), Some(&Value::text("replaced")));
        // "a" kept its first position.
        assert_eq!(row.field_names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn typed_getters_distinguish_missing_from_mismatched() {
        let row = Row::new().with("flag", Value::boolean(true));

        assert!(row.get_bool("flag").unwrap());
        assert!(matches!(
            row.get_bool("absent"),
            Err(EngineError::FieldNotFound(name)) if name == "absent"
        ));
        assert!(matches!(
            row.get_int("flag"),
            Err(EngineError::TypeMismatch(_))
        ));
    }

    #[test]
    fn equality_ignores_field_order() {
        let ab = Row::new()
            .with("a", Value::int(1))
            .with("b", Value::int(2));
        let ba = Row::new()
            .with("b", Value::int(2))
            .with("a", Value::int(1));
        let other = Row::new()
            .with("a", Value::int(1))
            .with("b", Value::int(3));

        assert_eq!(ab, ba);
        assert_ne!(ab, other);
    }

    #[test]
    fn display_lists_fields_in_insertion_order() {
        let row = Row::new()
            .with("id", Value::int(7))
            .with("name", Value::text("ada"))
            .with("active", Value::boolean(true));
        assert_eq!(row.to_string(), "{id: 7, name: ada, active: true}");
    }
}
