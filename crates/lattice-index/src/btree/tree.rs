//! The B+-tree proper.

use std::cmp::Ordering;
use std::collections::HashMap;

use lattice_common::{PageId, RowId, TypeMismatchError, Value, ValueKind};

use super::config::IndexConfig;
use super::error::{IndexError, IndexResult};
use super::node::{InternalNode, LeafNode, Node};

/// Issues arena page ids, monotonically. Pages are never reclaimed while
/// the tree lives; [`BPlusTree::clear`] resets the allocator wholesale.
#[derive(Debug, Default)]
struct PageAllocator {
    next: u64,
}

impl PageAllocator {
    fn allocate(&mut self) -> PageId {
        let page = PageId::new(self.next);
        self.next += 1;
        page
    }
}

/// Point-in-time structural counters for a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Live key/row entries.
    pub entry_count: usize,
    /// Allocated leaf nodes.
    pub leaf_count: usize,
    /// Allocated internal nodes.
    pub internal_count: usize,
    /// Levels from the root down to the leaves, inclusive.
    pub height: usize,
    /// Node splits since creation.
    pub splits: u64,
}

/// Outcome of a recursive insert below one node.
struct InsertOutcome {
    /// Previous reference when the key overwrote an existing entry.
    replaced: Option<RowId>,
    /// Separator and new right sibling when the target node split.
    split: Option<(Value, PageId)>,
}

/// A B+-tree from [`Value`] keys to row positions.
///
/// Keys are unique: inserting an existing key overwrites its row
/// reference (last write wins). All keys in one tree share a single
/// [`ValueKind`], fixed by the first insert; offering a key of any other
/// kind is a type error. Deletion is lazy: entries leave their leaf in
/// place and no nodes are merged, so lookups and scans stay correct while
/// underfull nodes persist until [`clear`](Self::clear).
#[derive(Debug)]
pub struct BPlusTree {
    config: IndexConfig,
    allocator: PageAllocator,
    nodes: HashMap<PageId, Node>,
    root: PageId,
    leaf_head: PageId,
    height: usize,
    key_kind: Option<ValueKind>,
    stats: TreeStats,
}

impl BPlusTree {
    /// Creates an empty tree with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    /// Creates an empty tree with `config`.
    ///
    /// The tree starts as a single empty leaf that is simultaneously the
    /// root and the head of the leaf chain.
    #[must_use]
    pub fn with_config(config: IndexConfig) -> Self {
        let mut allocator = PageAllocator::default();
        let root = allocator.allocate();
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::Leaf(LeafNode::new()));
        Self {
            config,
            allocator,
            nodes,
            root,
            leaf_head: root,
            height: 1,
            key_kind: None,
            stats: TreeStats {
                leaf_count: 1,
                height: 1,
                ..TreeStats::default()
            },
        }
    }

    /// The tree's configuration.
    #[must_use]
    pub fn config(&self) -> IndexConfig {
        self.config
    }

    /// Maximum keys per node.
    #[must_use]
    pub fn order(&self) -> usize {
        self.config.order()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stats.entry_count
    }

    /// Whether the tree holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.entry_count == 0
    }

    /// Levels from the root down to the leaves, inclusive.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of allocated nodes, leaves and internals together.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The head of the leaf chain.
    #[must_use]
    pub fn first_leaf(&self) -> PageId {
        self.leaf_head
    }

    /// The key kind this tree is fixed to, `None` before the first insert.
    #[must_use]
    pub fn key_kind(&self) -> Option<ValueKind> {
        self.key_kind
    }

    /// Structural counters.
    #[must_use]
    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    /// Validates `key` against the tree's key kind.
    pub fn check_key(&self, key: &Value) -> IndexResult<()> {
        match self.key_kind {
            Some(expected) if expected != key.kind() => Err(IndexError::KeyType(
                TypeMismatchError::new(expected, key.kind()),
            )),
            _ => Ok(()),
        }
    }

    /// Inserts `key` mapped to `row`, overwriting when the key exists.
    ///
    /// Returns the previous row reference on overwrite. Splits propagate
    /// upward as needed; a root split grows the tree by one level.
    pub fn insert(&mut self, key: Value, row: RowId) -> IndexResult<Option<RowId>> {
        self.check_key(&key)?;
        let kind = key.kind();
        let outcome = self.insert_at(self.root, key, row)?;
        if let Some((separator, right)) = outcome.split {
            self.grow_root(separator, right);
        }
        if outcome.replaced.is_none() {
            self.stats.entry_count += 1;
        }
        self.key_kind.get_or_insert(kind);
        Ok(outcome.replaced)
    }

    /// Point lookup: the row reference stored under `key`, if any.
    pub fn search(&self, key: &Value) -> IndexResult<Option<RowId>> {
        self.check_key(key)?;
        let page = self.find_leaf(key)?;
        Ok(self.leaf(page)?.get(key))
    }

    /// Collects every entry with `low <= key <= high` in ascending key
    /// order, inclusive on both ends.
    pub fn range_query(&self, low: &Value, high: &Value) -> IndexResult<Vec<(Value, RowId)>> {
        self.check_key(low)?;
        self.check_key(high)?;
        if low.try_compare(high)? == Ordering::Greater {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        let mut page = self.find_leaf(low)?;
        while page.is_valid() {
            let leaf = self.leaf(page)?;
            for entry in leaf.entries() {
                if entry.key.try_compare(high)? == Ordering::Greater {
                    return Ok(results);
                }
                if entry.key.try_compare(low)? != Ordering::Less {
                    results.push((entry.key.clone(), entry.row));
                }
            }
            page = leaf.next();
        }
        Ok(results)
    }

    /// Removes `key` from its leaf, reporting whether it was present.
    ///
    /// Deletion is lazy: no merging or redistribution happens, and a leaf
    /// emptied by deletes stays linked in the chain. Separators above may
    /// go stale, which routing tolerates because they still bound the same
    /// key intervals.
    pub fn delete(&mut self, key: &Value) -> IndexResult<bool> {
        self.check_key(key)?;
        let page = self.find_leaf(key)?;
        let removed = self.leaf_mut(page)?.remove(key);
        if removed.is_some() {
            self.stats.entry_count -= 1;
        }
        Ok(removed.is_some())
    }

    /// Every entry in ascending key order, walking the leaf chain.
    pub fn entries(&self) -> IndexResult<Vec<(Value, RowId)>> {
        let mut results = Vec::new();
        let mut page = self.leaf_head;
        while page.is_valid() {
            let leaf = self.leaf(page)?;
            results.extend(
                leaf.entries()
                    .iter()
                    .map(|entry| (entry.key.clone(), entry.row)),
            );
            page = leaf.next();
        }
        Ok(results)
    }

    /// Drops every entry and resets to a single empty root leaf. The key
    /// kind unlocks as well.
    pub fn clear(&mut self) {
        self.allocator = PageAllocator::default();
        let root = self.allocator.allocate();
        self.nodes.clear();
        self.nodes.insert(root, Node::Leaf(LeafNode::new()));
        self.root = root;
        self.leaf_head = root;
        self.height = 1;
        self.key_kind = None;
        self.stats = TreeStats {
            leaf_count: 1,
            height: 1,
            ..TreeStats::default()
        };
    }

    /// Descends from the root to the leaf owning `key`.
    fn find_leaf(&self, key: &Value) -> IndexResult<PageId> {
        let mut page = self.root;
        // Height bounds the descent; running past it means the arena
        // links form a cycle.
        for _ in 0..self.height {
            match self.node(page)? {
                Node::Leaf(_) => return Ok(page),
                Node::Internal(internal) => page = internal.find_child(key),
            }
        }
        Err(IndexError::invariant(format!(
            "descent exceeded height {} without reaching a leaf",
            self.height
        )))
    }

    fn insert_at(&mut self, page: PageId, key: Value, row: RowId) -> IndexResult<InsertOutcome> {
        let child = match self.node(page)? {
            Node::Leaf(_) => None,
            Node::Internal(internal) => Some(internal.find_child(&key)),
        };

        match child {
            None => {
                let order = self.config.order();
                let (replaced, overfull) = {
                    let leaf = self.leaf_mut(page)?;
                    let replaced = leaf.upsert(key, row);
                    (replaced, leaf.len() > order)
                };
                let split = if overfull {
                    Some(self.split_leaf(page)?)
                } else {
                    None
                };
                Ok(InsertOutcome { replaced, split })
            }
            Some(child_page) => {
                let outcome = self.insert_at(child_page, key, row)?;
                let Some((separator, right)) = outcome.split else {
                    return Ok(outcome);
                };
                let order = self.config.order();
                let overfull = {
                    let internal = self.internal_mut(page)?;
                    internal.insert_entry(separator, right);
                    internal.key_count() > order
                };
                let split = if overfull {
                    Some(self.split_internal(page)?)
                } else {
                    None
                };
                Ok(InsertOutcome {
                    replaced: outcome.replaced,
                    split,
                })
            }
        }
    }

    fn split_leaf(&mut self, page: PageId) -> IndexResult<(Value, PageId)> {
        let right_page = self.allocator.allocate();
        let (separator, right) = self.leaf_mut(page)?.split(right_page);
        self.nodes.insert(right_page, Node::Leaf(right));
        self.stats.leaf_count += 1;
        self.stats.splits += 1;
        Ok((separator, right_page))
    }

    fn split_internal(&mut self, page: PageId) -> IndexResult<(Value, PageId)> {
        let right_page = self.allocator.allocate();
        let (separator, right) = self.internal_mut(page)?.split();
        self.nodes.insert(right_page, Node::Internal(right));
        self.stats.internal_count += 1;
        self.stats.splits += 1;
        Ok((separator, right_page))
    }

    /// Installs a new root above the old one after a root split.
    fn grow_root(&mut self, separator: Value, right: PageId) {
        let new_root = self.allocator.allocate();
        let mut node = InternalNode::new(self.root);
        node.insert_entry(separator, right);
        self.nodes.insert(new_root, Node::Internal(node));
        self.root = new_root;
        self.height += 1;
        self.stats.internal_count += 1;
        self.stats.height = self.height;
    }

    fn node(&self, page: PageId) -> IndexResult<&Node> {
        self.nodes
            .get(&page)
            .ok_or_else(|| IndexError::invariant(format!("page {page} missing from the node arena")))
    }

    fn leaf(&self, page: PageId) -> IndexResult<&LeafNode> {
        match self.node(page)? {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Internal(_) => Err(IndexError::invariant(format!(
                "page {page} is internal where a leaf was required"
            ))),
        }
    }

    fn leaf_mut(&mut self, page: PageId) -> IndexResult<&mut LeafNode> {
        match self.nodes.get_mut(&page) {
            Some(Node::Leaf(leaf)) => Ok(leaf),
            Some(Node::Internal(_)) => Err(IndexError::invariant(format!(
                "page {page} is internal where a leaf was required"
            ))),
            None => Err(IndexError::invariant(format!(
                "page {page} missing from the node arena"
            ))),
        }
    }

    fn internal_mut(&mut self, page: PageId) -> IndexResult<&mut InternalNode> {
        match self.nodes.get_mut(&page) {
            Some(Node::Internal(internal)) => Ok(internal),
            Some(Node::Leaf(_)) => Err(IndexError::invariant(format!(
                "page {page} is a leaf where an internal node was required"
            ))),
            None => Err(IndexError::invariant(format!(
                "page {page} missing from the node arena"
            ))),
        }
    }
}

impl Default for BPlusTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl BPlusTree {
    /// Walks the whole tree asserting its structural invariants: uniform
    /// leaf depth, sorted nodes, bounded occupancy, and a leaf chain that
    /// covers every entry in ascending order.
    fn assert_structure(&self, expect_min_occupancy: bool) {
        let mut leaf_depth = None;
        let total = self.check_subtree(self.root, 1, &mut leaf_depth, expect_min_occupancy);
        assert_eq!(leaf_depth, Some(self.height), "height out of sync");
        assert_eq!(total, self.len(), "entry count out of sync");

        let entries = self.entries().unwrap();
        assert_eq!(entries.len(), self.len(), "leaf chain misses entries");
        for pair in entries.windows(2) {
            assert_eq!(
                pair[0].0.try_compare(&pair[1].0).unwrap(),
                Ordering::Less,
                "leaf chain out of order"
            );
        }
    }

    fn check_subtree(
        &self,
        page: PageId,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        expect_min_occupancy: bool,
    ) -> usize {
        match self.node(page).unwrap() {
            Node::Leaf(leaf) => {
                match *leaf_depth {
                    Some(expected) => assert_eq!(depth, expected, "leaves at unequal depths"),
                    None => *leaf_depth = Some(depth),
                }
                assert!(leaf.len() <= self.config.order(), "overfull leaf");
                if expect_min_occupancy && page != self.root {
                    assert!(leaf.len() >= self.config.min_keys(), "underfull leaf");
                }
                for pair in leaf.entries().windows(2) {
                    assert_eq!(
                        pair[0].key.try_compare(&pair[1].key).unwrap(),
                        Ordering::Less,
                        "leaf keys out of order"
                    );
                }
                leaf.len()
            }
            Node::Internal(internal) => {
                assert!(internal.key_count() <= self.config.order(), "overfull node");
                assert!(internal.key_count() >= 1, "separator-less internal node");
                if expect_min_occupancy && page != self.root {
                    assert!(
                        internal.child_count() >= self.config.min_keys(),
                        "underfull internal node"
                    );
                }
                for pair in internal.entries().windows(2) {
                    assert_eq!(
                        pair[0].key.try_compare(&pair[1].key).unwrap(),
                        Ordering::Less,
                        "separators out of order"
                    );
                }
                let mut total = self.check_subtree(
                    internal.leftmost_child(),
                    depth + 1,
                    leaf_depth,
                    expect_min_occupancy,
                );
                for entry in internal.entries() {
                    total +=
                        self.check_subtree(entry.child, depth + 1, leaf_depth, expect_min_occupancy);
                }
                total
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn small_tree() -> BPlusTree {
        BPlusTree::with_config(IndexConfig::for_testing())
    }

    #[test]
    fn starts_as_a_single_root_leaf() {
        let tree = BPlusTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.first_leaf(), PageId::new(0));
        assert_eq!(tree.key_kind(), None);
    }

    #[test]
    fn insert_then_search() {
        let mut tree = small_tree();
        for key in [5i64, 1, 9, 3, 7] {
            tree.insert(Value::int(key), RowId::new(key as u64)).unwrap();
        }
        for key in [5i64, 1, 9, 3, 7] {
            assert_eq!(
                tree.search(&Value::int(key)).unwrap(),
                Some(RowId::new(key as u64))
            );
        }
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.key_kind(), Some(ValueKind::Int));
        tree.assert_structure(true);
    }

    #[test]
    fn absent_keys_search_to_none() {
        let mut tree = small_tree();
        assert_eq!(tree.search(&Value::int(1)).unwrap(), None);
        tree.insert(Value::int(1), RowId::new(0)).unwrap();
        assert_eq!(tree.search(&Value::int(2)).unwrap(), None);
        for key in 0..100 {
            tree.insert(Value::int(key * 2), RowId::new(key as u64))
                .unwrap();
        }
        assert_eq!(tree.search(&Value::int(131)).unwrap(), None);
    }

    #[test]
    fn duplicate_insert_overwrites() {
        let mut tree = small_tree();
        assert_eq!(tree.insert(Value::int(4), RowId::new(1)).unwrap(), None);
        assert_eq!(
            tree.insert(Value::int(4), RowId::new(8)).unwrap(),
            Some(RowId::new(1))
        );
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.search(&Value::int(4)).unwrap(), Some(RowId::new(8)));
    }

    #[test]
    fn many_inserts_split_into_a_real_tree() {
        let mut tree = small_tree();
        let n = 16 * tree.order() as i64; // deep enough to split internal nodes too
        for key in 0..n {
            tree.insert(Value::int(key), RowId::new(key as u64)).unwrap();
        }

        assert!(tree.node_count() > 1, "tree never split");
        assert!(tree.height() > 1, "tree never grew");
        assert!(tree.stats().splits > 0);
        assert_eq!(tree.len(), n as usize);
        for key in 0..n {
            assert_eq!(
                tree.search(&Value::int(key)).unwrap(),
                Some(RowId::new(key as u64)),
                "key {key} lost after splits"
            );
        }
        tree.assert_structure(true);
    }

    #[test]
    fn descending_inserts_balance_too() {
        let mut tree = small_tree();
        for key in (0..64i64).rev() {
            tree.insert(Value::int(key), RowId::new(key as u64)).unwrap();
        }
        assert!(tree.height() > 1);
        for key in 0..64i64 {
            assert!(tree.search(&Value::int(key)).unwrap().is_some());
        }
        tree.assert_structure(true);
    }

    #[test]
    fn range_query_is_inclusive_and_sorted() {
        let mut tree = small_tree();
        for key in [10i64, 20, 30, 40, 50, 60] {
            tree.insert(Value::int(key), RowId::new(key as u64)).unwrap();
        }

        let hits = tree
            .range_query(&Value::int(20), &Value::int(50))
            .unwrap();
        let keys: Vec<i64> = hits.iter().map(|(k, _)| k.as_int().unwrap()).collect();
        assert_eq!(keys, vec![20, 30, 40, 50]);

        // Bounds that fall between keys.
        let hits = tree
            .range_query(&Value::int(15), &Value::int(45))
            .unwrap();
        let keys: Vec<i64> = hits.iter().map(|(k, _)| k.as_int().unwrap()).collect();
        assert_eq!(keys, vec![20, 30, 40]);

        // Inverted bounds yield nothing.
        assert!(tree
            .range_query(&Value::int(50), &Value::int(20))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn range_query_matches_a_linear_scan_on_random_keys() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut tree = small_tree();
        let mut keys = Vec::new();
        for _ in 0..200 {
            let key: i64 = rng.gen_range(0..1_000);
            if tree
                .insert(Value::int(key), RowId::new(key as u64))
                .unwrap()
                .is_none()
            {
                keys.push(key);
            }
        }
        keys.sort_unstable();

        for _ in 0..20 {
            let a: i64 = rng.gen_range(0..1_000);
            let b: i64 = rng.gen_range(0..1_000);
            let (low, high) = (a.min(b), a.max(b));

            let hits = tree
                .range_query(&Value::int(low), &Value::int(high))
                .unwrap();
            let got: Vec<i64> = hits.iter().map(|(k, _)| k.as_int().unwrap()).collect();
            let expected: Vec<i64> = keys
                .iter()
                .copied()
                .filter(|key| (low..=high).contains(key))
                .collect();
            assert_eq!(got, expected, "range [{low}, {high}] disagrees with scan");
        }
        tree.assert_structure(true);
    }

    #[test]
    fn delete_is_lazy_and_keeps_scans_correct() {
        let mut tree = small_tree();
        for key in 0..32i64 {
            tree.insert(Value::int(key), RowId::new(key as u64)).unwrap();
        }
        let nodes_before = tree.node_count();

        assert!(tree.delete(&Value::int(10)).unwrap());
        assert!(!tree.delete(&Value::int(10)).unwrap());
        assert_eq!(tree.search(&Value::int(10)).unwrap(), None);
        assert_eq!(tree.len(), 31);
        // No rebalancing: the shape is untouched.
        assert_eq!(tree.node_count(), nodes_before);

        let hits = tree.range_query(&Value::int(8), &Value::int(12)).unwrap();
        let keys: Vec<i64> = hits.iter().map(|(k, _)| k.as_int().unwrap()).collect();
        assert_eq!(keys, vec![8, 9, 11, 12]);

        // Reinsert lands back in the right place.
        tree.insert(Value::int(10), RowId::new(99)).unwrap();
        assert_eq!(tree.search(&Value::int(10)).unwrap(), Some(RowId::new(99)));
        tree.assert_structure(false);
    }

    #[test]
    fn draining_a_leaf_does_not_break_the_chain() {
        let mut tree = small_tree();
        for key in 0..32i64 {
            tree.insert(Value::int(key), RowId::new(key as u64)).unwrap();
        }
        // Empty out an interior stretch wider than one leaf.
        for key in 8..16i64 {
            assert!(tree.delete(&Value::int(key)).unwrap());
        }

        let hits = tree.range_query(&Value::int(0), &Value::int(31)).unwrap();
        let keys: Vec<i64> = hits.iter().map(|(k, _)| k.as_int().unwrap()).collect();
        let expected: Vec<i64> = (0..8).chain(16..32).collect();
        assert_eq!(keys, expected);
        tree.assert_structure(false);
    }

    #[test]
    fn foreign_key_kinds_are_rejected() {
        let mut tree = small_tree();
        tree.insert(Value::int(1), RowId::new(0)).unwrap();

        let err = tree.insert(Value::text("1"), RowId::new(1)).unwrap_err();
        assert!(matches!(err, IndexError::KeyType(_)));
        let err = tree.search(&Value::float(1.0)).unwrap_err();
        assert!(matches!(err, IndexError::KeyType(_)));
        let err = tree.delete(&Value::boolean(true)).unwrap_err();
        assert!(matches!(err, IndexError::KeyType(_)));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn text_keys_order_lexicographically() {
        let mut tree = small_tree();
        for (position, name) in ["pear", "apple", "fig", "banana", "plum", "kiwi"]
            .iter()
            .enumerate()
        {
            tree.insert(Value::text(*name), RowId::new(position as u64))
                .unwrap();
        }
        let entries = tree.entries().unwrap();
        let names: Vec<&str> = entries.iter().map(|(k, _)| k.as_text().unwrap()).collect();
        assert_eq!(
            names,
            vec!["apple", "banana", "fig", "kiwi", "pear", "plum"]
        );
    }

    #[test]
    fn clear_resets_shape_and_kind() {
        let mut tree = small_tree();
        for key in 0..32i64 {
            tree.insert(Value::int(key), RowId::new(key as u64)).unwrap();
        }
        tree.clear();

        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.key_kind(), None);
        // A different kind is acceptable after a reset.
        tree.insert(Value::text("a"), RowId::new(0)).unwrap();
        assert_eq!(
            tree.search(&Value::text("a")).unwrap(),
            Some(RowId::new(0))
        );
    }

    #[test]
    fn stats_reflect_growth() {
        let mut tree = small_tree();
        for key in 0..64i64 {
            tree.insert(Value::int(key), RowId::new(key as u64)).unwrap();
        }
        let stats = tree.stats();
        assert_eq!(stats.entry_count, 64);
        assert_eq!(stats.height, tree.height());
        assert_eq!(
            stats.leaf_count + stats.internal_count,
            tree.node_count()
        );
        assert!(stats.splits >= (stats.leaf_count as u64 - 1));
    }
}
