//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_INDEX_ORDER, MIN_INDEX_ORDER};
use crate::error::ConfigError;

/// Tuning knobs shared by a whole database instance.
///
/// Builder methods clamp their inputs into the supported range;
/// [`validate`](Self::validate) covers configurations built literally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Maximum keys an index node holds before it splits.
    pub index_order: usize,
    /// Bounded capacity of the query result cache, in entries.
    pub cache_capacity: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            index_order: DEFAULT_INDEX_ORDER,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl DatabaseConfig {
    /// Starts from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the index node order, clamped to the supported minimum.
    #[must_use]
    pub fn with_index_order(mut self, order: usize) -> Self {
        self.index_order = order.max(MIN_INDEX_ORDER);
        self
    }

    /// Sets the result cache capacity, at least one entry.
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity.max(1);
        self
    }

    /// Small sizes that exercise node splits and cache evictions quickly.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            index_order: 4,
            cache_capacity: 8,
        }
    }

    /// Rejects values the engine cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index_order < MIN_INDEX_ORDER {
            return Err(ConfigError::IndexOrderTooSmall(self.index_order));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::ZeroCacheCapacity);
        }
        Ok(())
    }
}
