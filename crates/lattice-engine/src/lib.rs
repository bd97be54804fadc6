//! # LatticeDB Engine
//!
//! The query layer of LatticeDB: schemaless typed [`Row`]s stored in
//! [`Table`]s with synchronously maintained ordered indexes, all owned by
//! a [`Database`] catalog that also provides equality joins (hash and
//! sort/merge, result-equivalent), single-column aggregation, a
//! mutation-invalidated result cache, and prepared statements over a
//! small SQL subset.
//!
//! ```
//! use lattice_engine::{CompareOp, Database, Predicate, Row, Value};
//!
//! let db = Database::new();
//! db.create_table("users").unwrap();
//! db.insert_into(
//!     "users",
//!     Row::new()
//!         .with("id", Value::int(1))
//!         .with("name", Value::text("ada")),
//! )
//! .unwrap();
//!
//! let adults = Predicate::new("id", CompareOp::Ge, Value::int(1));
//! assert_eq!(db.select_with_cache("users", &adults).unwrap().len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod database;
pub mod error;
pub mod join;
pub mod predicate;
pub mod row;
pub mod statement;
pub mod table;

pub use database::{Database, DatabaseStats};
pub use error::{EngineError, EngineResult};
pub use join::{hash_join, merge_join};
pub use predicate::{CompareOp, Predicate};
pub use row::Row;
pub use statement::{PreparedStatement, StatementRegistry};
pub use table::Table;

pub use lattice_common::{DatabaseConfig, RowId, Value, ValueKind};
