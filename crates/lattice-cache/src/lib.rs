//! # LatticeDB Cache
//!
//! Caching primitives for the engine:
//!
//! - [`LruCache`]: a bounded map with O(1) get/insert/evict, backed by a
//!   hash map plus an intrusive recency list.
//! - [`CacheStats`]: lock-free hit/miss/eviction counters.
//! - [`QueryCache`]: a table-aware result cache; any mutation of a table
//!   invalidates every result registered against it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lru;
pub mod query_cache;
pub mod stats;

pub use lru::LruCache;
pub use query_cache::{CacheKey, QueryCache};
pub use stats::CacheStats;
