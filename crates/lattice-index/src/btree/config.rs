//! Index tuning parameters.

use lattice_common::{DEFAULT_INDEX_ORDER, MIN_INDEX_ORDER};

/// Tuning parameters for a [`BPlusTree`](crate::BPlusTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    order: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            order: DEFAULT_INDEX_ORDER,
        }
    }
}

impl IndexConfig {
    /// Starts from the default order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum keys per node, clamped to the supported minimum.
    #[must_use]
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order.max(MIN_INDEX_ORDER);
        self
    }

    /// Maximum keys a node holds before it splits.
    #[inline]
    #[must_use]
    pub const fn order(&self) -> usize {
        self.order
    }

    /// Fewest entries either half of a split holds, `ceil(order / 2)`.
    #[inline]
    #[must_use]
    pub const fn min_keys(&self) -> usize {
        (self.order + 1) / 2
    }

    /// A small order that forces splits after a handful of inserts.
    #[must_use]
    pub fn for_testing() -> Self {
        Self { order: 4 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_is_sane() {
        let config = IndexConfig::default();
        assert_eq!(config.order(), DEFAULT_INDEX_ORDER);
        assert!(config.min_keys() >= 1);
    }

    #[test]
    fn with_order_clamps_to_minimum() {
        assert_eq!(IndexConfig::new().with_order(0).order(), MIN_INDEX_ORDER);
        assert_eq!(IndexConfig::new().with_order(1).order(), MIN_INDEX_ORDER);
        assert_eq!(IndexConfig::new().with_order(128).order(), 128);
    }

    #[test]
    fn min_keys_rounds_up() {
        assert_eq!(IndexConfig::new().with_order(4).min_keys(), 2);
        assert_eq!(IndexConfig::new().with_order(5).min_keys(), 3);
        assert_eq!(IndexConfig::for_testing().min_keys(), 2);
    }
}
