//! Engine-level error type.

use lattice_common::{ConfigError, RowId, TypeMismatchError};
use lattice_index::IndexError;
use thiserror::Error;

/// Everything that can go wrong inside the engine.
///
/// Most variants are ordinary, recoverable outcomes of talking to the
/// engine (a missing table, a type mismatch). [`EngineError::Index`] can
/// also carry an index structure violation, which signals internal
/// corruption and is not worth retrying.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The named table does not exist in the catalog.
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// A table with this name already exists.
    #[error("table '{0}' already exists")]
    TableExists(String),

    /// A row field referenced by name does not exist.
    #[error("field '{0}' not found")]
    FieldNotFound(String),

    /// No index has been built on the named column.
    #[error("no index on column '{0}'")]
    IndexNotFound(String),

    /// The row position does not refer to a live row.
    #[error("row {0} not found")]
    RowNotFound(RowId),

    /// No prepared statement is registered under this identifier.
    #[error("prepared statement '{0}' not found")]
    StatementNotFound(String),

    /// Two values of different kinds met where one kind was required.
    #[error(transparent)]
    TypeMismatch(#[from] TypeMismatchError),

    /// The aggregate is undefined on empty input.
    #[error("cannot aggregate '{column}' over zero rows: {function} is undefined on empty input")]
    EmptyAggregation {
        /// Aggregate function name.
        function: &'static str,
        /// Column being aggregated.
        column: String,
    },

    /// The statement text is not valid SQL.
    #[error("syntax error: {0}")]
    Parse(#[from] sqlparser::parser::ParserError),

    /// The statement parsed but falls outside the supported subset.
    #[error("unsupported statement: {0}")]
    Unsupported(String),

    /// Execution referenced a placeholder with no bound value.
    #[error("no value bound for parameter '{0}'")]
    MissingParameter(String),

    /// The database configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An index operation failed.
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Convenience alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_common::ValueKind;

    #[test]
    fn messages_name_the_missing_object() {
        assert_eq!(
            EngineError::TableNotFound("users".into()).to_string(),
            "table 'users' not found"
        );
        assert_eq!(
            EngineError::RowNotFound(RowId::new(7)).to_string(),
            "row 7 not found"
        );
        assert_eq!(
            EngineError::StatementNotFound("stmt_9".into()).to_string(),
            "prepared statement 'stmt_9' not found"
        );
    }

    #[test]
    fn type_mismatch_passes_through_transparently() {
        let err = EngineError::from(TypeMismatchError::new(ValueKind::Int, ValueKind::Text));
        assert_eq!(err.to_string(), "type mismatch: expected int, found text");
    }

    #[test]
    fn empty_aggregation_names_function_and_column() {
        let err = EngineError::EmptyAggregation {
            function: "avg",
            column: "price".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot aggregate 'price' over zero rows: avg is undefined on empty input"
        );
    }
}
