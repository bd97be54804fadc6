//! Table-aware query result cache.
//!
//! Results are keyed by table name plus a predicate fingerprint and held
//! in a bounded [`LruCache`]. A reverse index from table name to the keys
//! registered against it makes whole-table invalidation cheap, which is
//! how mutations keep the cache honest.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::lru::LruCache;
use crate::stats::CacheStats;

/// Identity of one cached result: the table it came from and standardized
/// text of the query that produced it.
///
/// Fingerprints are expected to be canonical: two queries share a key
/// exactly when they are the same query over the same table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    table: String,
    fingerprint: String,
}

impl CacheKey {
    /// Builds a key from a table name and a query fingerprint.
    pub fn new(table: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fingerprint: fingerprint.into(),
        }
    }

    /// The table the result was computed from.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The canonical query text.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// A bounded cache of query results with per-table invalidation.
///
/// `R` is the cached result type; entries are shared out as `Arc<R>` so a
/// hit never copies the stored result.
pub struct QueryCache<R> {
    cache: RwLock<LruCache<CacheKey, Arc<R>>>,
    table_index: RwLock<HashMap<String, HashSet<CacheKey>>>,
}

impl<R> QueryCache<R> {
    /// Creates a cache bounded to `capacity` results.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: RwLock::new(LruCache::new(capacity)),
            table_index: RwLock::new(HashMap::new()),
        }
    }

    /// Looks up a cached result, refreshing its recency on a hit.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<Arc<R>> {
        self.cache.write().get(key).cloned()
    }

    /// Stores `result` under `key` and registers the key against its
    /// table for later invalidation.
    pub fn insert(&self, key: CacheKey, result: R) {
        self.table_index
            .write()
            .entry(key.table.clone())
            .or_default()
            .insert(key.clone());
        self.cache.write().insert(key, Arc::new(result));
    }

    /// Drops every result registered against `table`, returning how many
    /// live entries were removed.
    pub fn invalidate_table(&self, table: &str) -> usize {
        let Some(keys) = self.table_index.write().remove(table) else {
            return 0;
        };
        let mut cache = self.cache.write();
        let mut removed = 0;
        for key in &keys {
            if cache.remove(key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Drops every cached result.
    pub fn clear(&self) {
        self.cache.write().clear();
        self.table_index.write().clear();
    }

    /// Number of live cached results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Successful lookups so far.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.cache.read().stats().hits()
    }

    /// Failed lookups so far.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.cache.read().stats().misses()
    }

    /// Snapshot of all counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.read().stats().clone()
    }
}
