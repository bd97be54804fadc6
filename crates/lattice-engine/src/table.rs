//! Tables: append-ordered rows with synchronously maintained indexes.

use std::collections::HashMap;

use lattice_common::{RowId, Value};
use lattice_index::{BPlusTree, IndexConfig, IndexError};

use crate::error::{EngineError, EngineResult};
use crate::predicate::Predicate;
use crate::row::Row;

/// An in-memory table.
///
/// Rows live in a positional vector: a row's [`RowId`] is the slot it was
/// appended at, ids grow monotonically, and a deleted row leaves a
/// tombstone behind so no position is ever reused. Any number of ordered
/// indexes may be attached, one per column; every mutation keeps them in
/// step before it returns.
#[derive(Debug)]
pub struct Table {
    name: String,
    rows: Vec<Option<Row>>,
    indexes: HashMap<String, BPlusTree>,
    index_config: IndexConfig,
    live: usize,
    version: u64,
}

impl Table {
    /// Creates an empty table named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_index_config(name, IndexConfig::default())
    }

    /// Creates an empty table whose indexes will use `config`.
    pub fn with_index_config(name: impl Into<String>, config: IndexConfig) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            indexes: HashMap::new(),
            index_config: config,
            live: 0,
            version: 0,
        }
    }

    /// The table's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends `row` and returns its position.
    ///
    /// Index key kinds are validated up front, so a rejected row leaves
    /// every index untouched.
    pub fn insert(&mut self, row: Row) -> EngineResult<RowId> {
        for (column, index) in &self.indexes {
            if let Some(key) = row.get(column) {
                index.check_key(key)?;
            }
        }

        let row_id = RowId::new(self.rows.len() as u64);
        for (column, index) in &mut self.indexes {
            if let Some(key) = row.get(column) {
                index.insert(key.clone(), row_id)?;
            }
        }
        self.rows.push(Some(row));
        self.live += 1;
        self.version += 1;
        Ok(row_id)
    }

    /// Replaces the row at `row_id` with `row`, rekeying every index.
    pub fn update(&mut self, row_id: RowId, row: Row) -> EngineResult<()> {
        let slot = row_id.as_u64() as usize;
        let Some(Some(old)) = self.rows.get(slot) else {
            return Err(EngineError::RowNotFound(row_id));
        };

        for (column, index) in &self.indexes {
            if let Some(key) = row.get(column) {
                index.check_key(key)?;
            }
        }

        for (column, index) in &mut self.indexes {
            // Only drop entries this row still owns: a later insert of the
            // same key would have overwritten ours.
            if let Some(old_key) = old.get(column) {
                if index.search(old_key)? == Some(row_id) {
                    index.delete(old_key)?;
                }
            }
            if let Some(new_key) = row.get(column) {
                index.insert(new_key.clone(), row_id)?;
            }
        }

        self.rows[slot] = Some(row);
        self.version += 1;
        Ok(())
    }

    /// Removes the row at `row_id`, leaving a tombstone in its slot, and
    /// returns the removed row.
    pub fn delete(&mut self, row_id: RowId) -> EngineResult<Row> {
        let slot = row_id.as_u64() as usize;
        let row = match self.rows.get_mut(slot).and_then(Option::take) {
            Some(row) => row,
            None => return Err(EngineError::RowNotFound(row_id)),
        };

        for (column, index) in &mut self.indexes {
            if let Some(key) = row.get(column) {
                if index.search(key)? == Some(row_id) {
                    index.delete(key)?;
                }
            }
        }

        self.live -= 1;
        self.version += 1;
        Ok(row)
    }

    /// The row at `row_id`, if it is live.
    #[must_use]
    pub fn get(&self, row_id: RowId) -> Option<&Row> {
        self.rows.get(row_id.as_u64() as usize)?.as_ref()
    }

    /// Every live row in append order.
    #[must_use]
    pub fn get_all(&self) -> Vec<Row> {
        self.rows.iter().flatten().cloned().collect()
    }

    /// Iterates over live rows in append order.
    pub fn iter(&self) -> impl Iterator<Item = &Row> + '_ {
        self.rows.iter().flatten()
    }

    /// Live rows satisfying `predicate`, in append order.
    pub fn select(&self, predicate: &Predicate) -> EngineResult<Vec<Row>> {
        let mut results = Vec::new();
        for row in self.iter() {
            if predicate.matches(row)? {
                results.push(row.clone());
            }
        }
        Ok(results)
    }

    /// Builds (or rebuilds) an ordered index over `column`.
    ///
    /// Rows lacking the column are skipped. The new tree replaces any
    /// existing index on the column only once it builds completely, so a
    /// kind conflict partway through leaves the old index intact.
    pub fn build_index(&mut self, column: &str) -> EngineResult<()> {
        let mut tree = BPlusTree::with_config(self.index_config);
        for (slot, row) in self.rows.iter().enumerate() {
            let Some(row) = row else { continue };
            if let Some(key) = row.get(column) {
                tree.insert(key.clone(), RowId::new(slot as u64))?;
            }
        }
        self.indexes.insert(column.to_owned(), tree);
        Ok(())
    }

    /// The index on `column`, if one was built.
    #[must_use]
    pub fn index(&self, column: &str) -> Option<&BPlusTree> {
        self.indexes.get(column)
    }

    /// Whether `column` carries an index.
    #[must_use]
    pub fn has_index(&self, column: &str) -> bool {
        self.indexes.contains_key(column)
    }

    /// Indexed column names, sorted.
    #[must_use]
    pub fn index_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.indexes.keys().cloned().collect();
        columns.sort();
        columns
    }

    /// Number of indexes attached to the table.
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }

    /// Point lookup through the index on `column`.
    pub fn index_search(&self, column: &str, key: &Value) -> EngineResult<Option<Row>> {
        match self.require_index(column)?.search(key)? {
            Some(row_id) => Ok(Some(self.resolve(row_id)?)),
            None => Ok(None),
        }
    }

    /// Rows with `low <= key <= high` through the index on `column`, in
    /// ascending key order.
    pub fn index_range(&self, column: &str, low: &Value, high: &Value) -> EngineResult<Vec<Row>> {
        let entries = self.require_index(column)?.range_query(low, high)?;
        entries
            .into_iter()
            .map(|(_, row_id)| self.resolve(row_id))
            .collect()
    }

    /// Removes `key` from the index on `column` without touching the row
    /// it referenced. Returns whether the key was present.
    pub fn index_delete(&mut self, column: &str, key: &Value) -> EngineResult<bool> {
        let index = self
            .indexes
            .get_mut(column)
            .ok_or_else(|| EngineError::IndexNotFound(column.to_owned()))?;
        Ok(index.delete(key)?)
    }

    /// Live rows in the table.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.live
    }

    /// Counter bumped by every insert, update, and delete.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    fn require_index(&self, column: &str) -> EngineResult<&BPlusTree> {
        self.indexes
            .get(column)
            .ok_or_else(|| EngineError::IndexNotFound(column.to_owned()))
    }

    fn resolve(&self, row_id: RowId) -> EngineResult<Row> {
        match self.get(row_id) {
            Some(row) => Ok(row.clone()),
            None => Err(EngineError::Index(IndexError::invariant(format!(
                "index entry references missing row {row_id}"
            )))),
        }
    }
}
