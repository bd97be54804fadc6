//! # LatticeDB Common
//!
//! Shared primitives used across the LatticeDB engine crates:
//!
//! - [`Value`] and [`ValueKind`]: the typed scalar model with strict
//!   per-kind comparison semantics.
//! - [`RowId`] and [`PageId`]: stable row positions and index arena
//!   addresses.
//! - [`DatabaseConfig`]: validated engine tuning.
//! - [`TypeMismatchError`]: the single source of cross-kind comparison
//!   failures.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use config::DatabaseConfig;
pub use constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_INDEX_ORDER, MIN_INDEX_ORDER};
pub use error::{ConfigError, TypeMismatchError};
pub use types::{PageId, RowId, Value, ValueKind};
