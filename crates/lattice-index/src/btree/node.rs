//! Leaf and internal node representations.
//!
//! Nodes never own one another: children and chain links are [`PageId`]s
//! resolved through the owning tree's arena. The tree validates key kinds
//! before descending, and keys are unique tree-wide, so every comparison
//! in this module is total and separators within a node are strictly
//! increasing.

use std::cmp::Ordering;

use lattice_common::{PageId, RowId, Value};

/// One key/row pair stored in a leaf.
#[derive(Debug, Clone)]
pub struct LeafEntry {
    /// The indexed key.
    pub key: Value,
    /// Position of the row carrying the key.
    pub row: RowId,
}

/// A separator key and the child holding keys at or above it.
#[derive(Debug, Clone)]
pub struct InternalEntry {
    /// Separator copied up from a split.
    pub key: Value,
    /// Subtree with keys `>= key`.
    pub child: PageId,
}

/// Bottom level of the tree: sorted entries plus the forward chain link.
#[derive(Debug, Clone)]
pub struct LeafNode {
    entries: Vec<LeafEntry>,
    next: PageId,
}

impl LeafNode {
    /// Creates an empty leaf with no successor.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next: PageId::INVALID,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the leaf holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The following leaf in the chain, `PageId::INVALID` at the tail.
    pub fn next(&self) -> PageId {
        self.next
    }

    /// Read-only view of the sorted entries.
    pub fn entries(&self) -> &[LeafEntry] {
        &self.entries
    }

    fn position(&self, key: &Value) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|entry| entry.key.compare(key).unwrap_or(Ordering::Equal))
    }

    /// Inserts `key` at its sorted position, replacing the row reference
    /// when the key is already present. Returns the previous reference on
    /// overwrite.
    pub fn upsert(&mut self, key: Value, row: RowId) -> Option<RowId> {
        match self.position(&key) {
            Ok(at) => Some(std::mem::replace(&mut self.entries[at].row, row)),
            Err(at) => {
                self.entries.insert(at, LeafEntry { key, row });
                None
            }
        }
    }

    /// The row reference stored under `key`, if any.
    pub fn get(&self, key: &Value) -> Option<RowId> {
        self.position(key).ok().map(|at| self.entries[at].row)
    }

    /// Removes `key` if present, returning its row reference. No
    /// rebalancing happens at this level.
    pub fn remove(&mut self, key: &Value) -> Option<RowId> {
        match self.position(key) {
            Ok(at) => Some(self.entries.remove(at).row),
            Err(_) => None,
        }
    }

    /// Splits off the upper half into a new right sibling.
    ///
    /// `self` keeps the lower half and its own page id, so chain heads and
    /// parent links stay valid; the sibling takes over `self`'s successor
    /// and `self` now points at `right_page`. Returns the separator (a
    /// copy of the sibling's first key) and the sibling node. Only called
    /// on overfull leaves, which always hold at least two entries.
    pub fn split(&mut self, right_page: PageId) -> (Value, LeafNode) {
        let mid = self.entries.len() / 2;
        let upper = self.entries.split_off(mid);
        let right = LeafNode {
            entries: upper,
            next: self.next,
        };
        self.next = right_page;
        let separator = right.entries[0].key.clone();
        (separator, right)
    }
}

impl Default for LeafNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Routing level of the tree: separator keys between child pages.
///
/// A node with `n` separators has `n + 1` children; `leftmost_child`
/// covers keys below the first separator.
#[derive(Debug, Clone)]
pub struct InternalNode {
    leftmost_child: PageId,
    entries: Vec<InternalEntry>,
}

impl InternalNode {
    /// Creates a node routing everything to a single child.
    pub fn new(leftmost_child: PageId) -> Self {
        Self {
            leftmost_child,
            entries: Vec::new(),
        }
    }

    /// Number of separator keys.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of children, always one more than the key count.
    pub fn child_count(&self) -> usize {
        self.entries.len() + 1
    }

    /// The child covering keys below the first separator.
    pub fn leftmost_child(&self) -> PageId {
        self.leftmost_child
    }

    /// Read-only view of the separators.
    pub fn entries(&self) -> &[InternalEntry] {
        &self.entries
    }

    /// Picks the child to descend into for `key`.
    ///
    /// Keys equal to a separator belong to the right subtree.
    pub fn find_child(&self, key: &Value) -> PageId {
        match self
            .entries
            .binary_search_by(|entry| entry.key.compare(key).unwrap_or(Ordering::Equal))
        {
            Ok(at) => self.entries[at].child,
            Err(0) => self.leftmost_child,
            Err(at) => self.entries[at - 1].child,
        }
    }

    /// Inserts a separator/child pair at its sorted position.
    pub fn insert_entry(&mut self, key: Value, child: PageId) {
        match self
            .entries
            .binary_search_by(|entry| entry.key.compare(&key).unwrap_or(Ordering::Equal))
        {
            // Separators stay unique while tree keys are unique; an exact
            // hit can only reroute.
            Ok(at) => self.entries[at].child = child,
            Err(at) => self.entries.insert(at, InternalEntry { key, child }),
        }
    }

    /// Splits an overfull node, promoting its middle separator.
    ///
    /// The promoted key moves up rather than being copied down, and its
    /// child becomes the right node's leftmost child. Only called on
    /// overfull nodes, which hold at least three separators.
    pub fn split(&mut self) -> (Value, InternalNode) {
        let mid = self.entries.len() / 2;
        let mut upper = self.entries.split_off(mid);
        let promoted = upper.remove(0);
        let right = InternalNode {
            leftmost_child: promoted.child,
            entries: upper,
        };
        (promoted.key, right)
    }
}

/// A tree node as stored in the arena.
#[derive(Debug, Clone)]
pub enum Node {
    /// Bottom level holding the actual entries.
    Leaf(LeafNode),
    /// Routing level holding separators.
    Internal(InternalNode),
}
