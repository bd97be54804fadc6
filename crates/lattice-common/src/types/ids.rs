//! Identifier newtypes.
//!
//! Raw `u64`s are easy to mix up across subsystems; these transparent
//! wrappers keep row positions and tree pages apart at the type level.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable position of a row within its table.
///
/// Positions are assigned at insert, monotonically, and are never reused:
/// a deleted row leaves its position vacant rather than shifting later
/// rows.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RowId(u64);

impl RowId {
    /// Sentinel for an unassigned position.
    pub const INVALID: Self = Self(u64::MAX);

    /// The first position a table assigns.
    pub const FIRST: Self = Self(0);

    /// Wraps a raw position.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw position.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The following position, saturating at the sentinel.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Whether this is a real position rather than the sentinel.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "RowId({})", self.0)
        } else {
            write!(f, "RowId(INVALID)")
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RowId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<RowId> for u64 {
    fn from(id: RowId) -> Self {
        id.0
    }
}

/// Address of a tree node in an index arena.
///
/// Nodes never reference one another directly; every child pointer and
/// leaf chain link is a `PageId` resolved through the owning tree. The
/// root and the head of the leaf chain are the same node reached by two
/// ids, never two copies.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PageId(u64);

impl PageId {
    /// Sentinel for the absence of a node, e.g. past the last leaf.
    pub const INVALID: Self = Self(u64::MAX);

    /// The first page an allocator issues.
    pub const FIRST: Self = Self(0);

    /// Wraps a raw page number.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw page number.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The following page number, saturating at the sentinel.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Whether this id addresses a node rather than the sentinel.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "PageId({})", self.0)
        } else {
            write!(f, "PageId(INVALID)")
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PageId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<PageId> for u64 {
    fn from(id: PageId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_id_roundtrip_and_order() {
        let id = RowId::new(7);
        assert_eq!(id.as_u64(), 7);
        assert_eq!(id.next(), RowId::new(8));
        assert!(RowId::new(1) < RowId::new(2));
        assert_eq!(u64::from(RowId::from(9u64)), 9);
    }

    #[test]
    fn invalid_ids_are_flagged() {
        assert!(!RowId::INVALID.is_valid());
        assert!(!PageId::INVALID.is_valid());
        assert!(RowId::FIRST.is_valid());
        assert_eq!(PageId::INVALID.next(), PageId::INVALID);
    }

    #[test]
    fn debug_marks_the_sentinel() {
        assert_eq!(format!("{:?}", PageId::new(42)), "PageId(42)");
        assert_eq!(format!("{:?}", PageId::INVALID), "PageId(INVALID)");
        assert_eq!(format!("{:?}", RowId::INVALID), "RowId(INVALID)");
    }

    #[test]
    fn display_is_the_raw_number() {
        assert_eq!(PageId::new(3).to_string(), "3");
        assert_eq!(RowId::new(12).to_string(), "12");
    }
}
