//! # LatticeDB Index
//!
//! The ordered secondary index used by LatticeDB tables: a B+-tree mapping
//! [`Value`](lattice_common::Value) keys to row positions, with point
//! lookup, inclusive range scans over a linked leaf chain, last-write-wins
//! insertion, and lazy deletion.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod btree;

pub use btree::{BPlusTree, IndexConfig, IndexError, IndexResult, TreeStats};
