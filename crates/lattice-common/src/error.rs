//! Errors shared by every layer of the engine.

use thiserror::Error;

use crate::constants::MIN_INDEX_ORDER;
use crate::types::ValueKind;

/// Two value kinds met where a single kind was required.
///
/// Comparisons never coerce: cross-kind ordering, index keys of a foreign
/// kind, mixed-kind join columns, and typed row accessors all report this
/// error instead of converting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("type mismatch: expected {expected}, found {found}")]
pub struct TypeMismatchError {
    /// The kind the operation required.
    pub expected: ValueKind,
    /// The kind actually supplied.
    pub found: ValueKind,
}

impl TypeMismatchError {
    /// Builds the error from the required and supplied kinds.
    #[must_use]
    pub const fn new(expected: ValueKind, found: ValueKind) -> Self {
        Self { expected, found }
    }
}

/// Configuration values the engine cannot honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The index order is too small to form tree nodes.
    #[error("index order {0} is below the supported minimum {MIN_INDEX_ORDER}")]
    IndexOrderTooSmall(usize),

    /// The result cache needs room for at least one entry.
    #[error("cache capacity must be at least 1")]
    ZeroCacheCapacity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_message_names_both_kinds() {
        let err = TypeMismatchError::new(ValueKind::Float, ValueKind::Text);
        assert_eq!(err.to_string(), "type mismatch: expected float, found text");
    }

    #[test]
    fn config_error_messages() {
        assert_eq!(
            ConfigError::IndexOrderTooSmall(1).to_string(),
            "index order 1 is below the supported minimum 2"
        );
        assert_eq!(
            ConfigError::ZeroCacheCapacity.to_string(),
            "cache capacity must be at least 1"
        );
    }
}
