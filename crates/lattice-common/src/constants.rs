//! System-wide defaults and limits.

/// Default maximum number of keys an index node holds before splitting.
pub const DEFAULT_INDEX_ORDER: usize = 32;

/// Smallest index order that still forms a meaningful B+-tree node.
pub const MIN_INDEX_ORDER: usize = 2;

/// Default bounded capacity of the query result cache, in entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;
