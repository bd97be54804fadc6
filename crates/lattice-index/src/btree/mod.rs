//! B+-tree ordered index.
//!
//! Keys live only in leaves; internal nodes hold separator copies that
//! route descent. Leaves chain forward so range scans walk siblings
//! instead of re-descending:
//!
//! ```text
//!                 [ 17 | 40 ]            internal (separators)
//!                /     |     \
//!         [3 9] -> [17 23 31] -> [40 52]  leaves, forward-linked
//! ```
//!
//! Nodes are stored in an arena and addressed by
//! [`PageId`](lattice_common::PageId); the root and the head of the leaf
//! chain are ids into the same arena, so a tree of height one is a single
//! node reachable both ways.
//!
//! # Usage
//!
//! ```
//! use lattice_common::{RowId, Value};
//! use lattice_index::BPlusTree;
//!
//! # fn main() -> lattice_index::IndexResult<()> {
//! let mut tree = BPlusTree::new();
//! tree.insert(Value::int(42), RowId::new(0))?;
//! assert_eq!(tree.search(&Value::int(42))?, Some(RowId::new(0)));
//! assert_eq!(tree.search(&Value::int(7))?, None);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod node;
mod tree;

pub use config::IndexConfig;
pub use error::{IndexError, IndexResult};
pub use tree::{BPlusTree, TreeStats};
