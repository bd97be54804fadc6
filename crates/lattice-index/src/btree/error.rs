//! Index error types.

use lattice_common::TypeMismatchError;
use thiserror::Error;

/// Errors raised by index operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The key's kind differs from the keys the tree already holds.
    #[error("index key {0}")]
    KeyType(#[from] TypeMismatchError),

    /// The tree violated one of its own structural invariants. This class
    /// is fatal for the operation and is never retried.
    #[error("index structure violation: {0}")]
    InvariantViolation(String),
}

impl IndexError {
    /// Builds an [`IndexError::InvariantViolation`].
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }
}

/// Convenience alias for index operation results.
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_common::ValueKind;

    #[test]
    fn messages_read_naturally() {
        let err = IndexError::KeyType(TypeMismatchError::new(ValueKind::Int, ValueKind::Text));
        assert_eq!(
            err.to_string(),
            "index key type mismatch: expected int, found text"
        );

        let err = IndexError::invariant("page 9 missing from the node arena");
        assert_eq!(
            err.to_string(),
            "index structure violation: page 9 missing from the node arena"
        );
    }
}
