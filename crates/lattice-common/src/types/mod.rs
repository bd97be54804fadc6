//! Core data types shared across the engine.

pub mod ids;
pub mod value;

pub use ids::{PageId, RowId};
pub use value::{Value, ValueKind};
