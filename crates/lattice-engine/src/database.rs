//! The database catalog: named tables, cross-table queries, the result
//! cache, and the prepared statement registry behind one handle.
//!
//! A [`Database`] owns all engine state; nothing escapes as a reference
//! into it. Every mutating table operation runs inside that table's mutex
//! and invalidates the table's cached results before returning, so a
//! completed mutation is never followed by a stale cached read.

use std::collections::HashMap;

use lattice_cache::{CacheKey, CacheStats, QueryCache};
use lattice_common::{DatabaseConfig, RowId, Value};
use lattice_index::IndexConfig;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::aggregate;
use crate::error::{EngineError, EngineResult};
use crate::join;
use crate::predicate::Predicate;
use crate::row::Row;
use crate::statement::StatementRegistry;
use crate::table::Table;

/// One-call health snapshot of a database.
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    /// Registered tables.
    pub table_count: usize,
    /// Live rows across all tables.
    pub row_count: usize,
    /// Indexes across all tables.
    pub index_count: usize,
    /// Result cache counters.
    pub cache: CacheStats,
}

/// An embedded, in-process database instance.
///
/// Tables live behind individual mutexes inside a read-locked catalog
/// map, so reads of different tables proceed in parallel while each
/// table's mutations serialize. All results are snapshots.
pub struct Database {
    tables: RwLock<HashMap<String, Mutex<Table>>>,
    cache: QueryCache<Vec<Row>>,
    statements: Mutex<StatementRegistry>,
    config: DatabaseConfig,
}

impl Database {
    /// Creates a database with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        // The default configuration always validates.
        Self::with_config(DatabaseConfig::default()).unwrap_or_else(|_| unreachable!())
    }

    /// Creates a database with `config`, rejecting invalid settings.
    pub fn with_config(config: DatabaseConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            tables: RwLock::new(HashMap::new()),
            cache: QueryCache::new(config.cache_capacity),
            statements: Mutex::new(StatementRegistry::new()),
            config,
        })
    }

    /// The configuration this database was built with.
    #[must_use]
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    // ---- catalog ----------------------------------------------------

    /// Registers an empty table named `name`.
    pub fn create_table(&self, name: &str) -> EngineResult<()> {
        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(EngineError::TableExists(name.to_owned()));
        }
        let index_config = IndexConfig::new().with_order(self.config.index_order);
        tables.insert(
            name.to_owned(),
            Mutex::new(Table::with_index_config(name, index_config)),
        );
        debug!(table = name, "created table");
        Ok(())
    }

    /// Removes `name` and every cached result computed from it.
    pub fn drop_table(&self, name: &str) -> EngineResult<()> {
        let removed = self.tables.write().remove(name);
        if removed.is_none() {
            return Err(EngineError::TableNotFound(name.to_owned()));
        }
        let invalidated = self.cache.invalidate_table(name);
        debug!(table = name, invalidated, "dropped table");
        Ok(())
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Registered table names, sorted.
    #[must_use]
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered tables.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }

    /// Snapshot of table, row, index, and cache counters.
    #[must_use]
    pub fn stats(&self) -> DatabaseStats {
        let tables = self.tables.read();
        let mut row_count = 0;
        let mut index_count = 0;
        for table in tables.values() {
            let table = table.lock();
            row_count += table.row_count();
            index_count += table.index_count();
        }
        DatabaseStats {
            table_count: tables.len(),
            row_count,
            index_count,
            cache: self.cache.stats(),
        }
    }

    // ---- table operations -------------------------------------------

    /// Appends `row` to `table`, returning its stable position.
    pub fn insert_into(&self, table: &str, row: Row) -> EngineResult<RowId> {
        self.with_table(table, |t| {
            let row_id = t.insert(row)?;
            let invalidated = self.cache.invalidate_table(table);
            trace!(table, %row_id, invalidated, "inserted row");
            Ok(row_id)
        })
    }

    /// Replaces the row at `row_id` in `table`.
    pub fn update_row(&self, table: &str, row_id: RowId, row: Row) -> EngineResult<()> {
        self.with_table(table, |t| {
            t.update(row_id, row)?;
            let invalidated = self.cache.invalidate_table(table);
            trace!(table, %row_id, invalidated, "updated row");
            Ok(())
        })
    }

    /// Removes the row at `row_id` from `table`, returning it.
    pub fn delete_row(&self, table: &str, row_id: RowId) -> EngineResult<Row> {
        self.with_table(table, |t| {
            let row = t.delete(row_id)?;
            let invalidated = self.cache.invalidate_table(table);
            trace!(table, %row_id, invalidated, "deleted row");
            Ok(row)
        })
    }

    /// Every live row of `table` in append order.
    pub fn select_all(&self, table: &str) -> EngineResult<Vec<Row>> {
        self.with_table(table, |t| Ok(t.get_all()))
    }

    /// Live rows of `table` satisfying `predicate`, bypassing the cache.
    pub fn select_where(&self, table: &str, predicate: &Predicate) -> EngineResult<Vec<Row>> {
        self.with_table(table, |t| t.select(predicate))
    }

    /// Builds (or rebuilds) an ordered index over `column` of `table`.
    pub fn build_index(&self, table: &str, column: &str) -> EngineResult<()> {
        self.with_table(table, |t| {
            t.build_index(column)?;
            debug!(table, column, "built index");
            Ok(())
        })
    }

    /// Point lookup through the index on `column` of `table`.
    pub fn index_search(&self, table: &str, column: &str, key: &Value) -> EngineResult<Option<Row>> {
        self.with_table(table, |t| t.index_search(column, key))
    }

    /// Rows of `table` with `low <= key <= high` on the indexed `column`,
    /// in ascending key order.
    pub fn index_range(
        &self,
        table: &str,
        column: &str,
        low: &Value,
        high: &Value,
    ) -> EngineResult<Vec<Row>> {
        self.with_table(table, |t| t.index_range(column, low, high))
    }

    /// Removes `key` from the index on `column` of `table` without
    /// touching the row it referenced.
    pub fn index_delete(&self, table: &str, column: &str, key: &Value) -> EngineResult<bool> {
        self.with_table(table, |t| t.index_delete(column, key))
    }

    // ---- joins ------------------------------------------------------

    /// Inner hash join of `left` and `right` on equality of the named
    /// columns.
    pub fn hash_join(
        &self,
        left: &str,
        right: &str,
        left_column: &str,
        right_column: &str,
    ) -> EngineResult<Vec<Row>> {
        self.with_two_tables(left, right, |l, r| {
            join::hash_join(l, r, left_column, right_column)
        })
    }

    /// Inner sort/merge join of `left` and `right` on equality of the
    /// named columns. Result multiset matches [`hash_join`](Self::hash_join).
    pub fn merge_join(
        &self,
        left: &str,
        right: &str,
        left_column: &str,
        right_column: &str,
    ) -> EngineResult<Vec<Row>> {
        self.with_two_tables(left, right, |l, r| {
            join::merge_join(l, r, left_column, right_column)
        })
    }

    // ---- aggregation ------------------------------------------------

    /// Sum of `column` across `table`; 0.0 when nothing contributes.
    pub fn sum(&self, table: &str, column: &str) -> EngineResult<f64> {
        self.with_table(table, |t| aggregate::sum(t, column))
    }

    /// Arithmetic mean of `column` across `table`; an error when nothing
    /// contributes.
    pub fn avg(&self, table: &str, column: &str) -> EngineResult<f64> {
        self.with_table(table, |t| aggregate::avg(t, column))
    }

    /// Rows of `table` carrying `column`; an empty column name counts
    /// every row.
    pub fn count(&self, table: &str, column: &str) -> EngineResult<u64> {
        self.with_table(table, |t| Ok(aggregate::count(t, column)))
    }

    /// Largest value of `column` in `table`, in the column's native kind.
    pub fn max(&self, table: &str, column: &str) -> EngineResult<Option<Value>> {
        self.with_table(table, |t| aggregate::max(t, column))
    }

    /// Smallest value of `column` in `table`, in the column's native kind.
    pub fn min(&self, table: &str, column: &str) -> EngineResult<Option<Value>> {
        self.with_table(table, |t| aggregate::min(t, column))
    }

    // ---- result cache -----------------------------------------------

    /// Live rows of `table` satisfying `predicate`, served from the
    /// result cache when an identical query ran since the table's last
    /// mutation.
    ///
    /// The consult-evaluate-fill sequence runs under the table's mutex,
    /// so a concurrent mutation either happens before (and the fill sees
    /// its rows) or after (and its invalidation drops the fill).
    pub fn select_with_cache(&self, table: &str, predicate: &Predicate) -> EngineResult<Vec<Row>> {
        self.with_table(table, |t| {
            let key = CacheKey::new(table, predicate.fingerprint());
            if let Some(cached) = self.cache.get(&key) {
                trace!(table, %predicate, "cache hit");
                return Ok(cached.as_ref().clone());
            }
            let rows = t.select(predicate)?;
            trace!(table, %predicate, rows = rows.len(), "cache miss");
            self.cache.insert(key, rows.clone());
            Ok(rows)
        })
    }

    /// Result cache lookups that found their entry.
    #[must_use]
    pub fn cache_hits(&self) -> u64 {
        self.cache.hits()
    }

    /// Result cache lookups that found nothing.
    #[must_use]
    pub fn cache_misses(&self) -> u64 {
        self.cache.misses()
    }

    /// All result cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ---- prepared statements ----------------------------------------

    /// Parses and registers `text`, returning its `stmt_<n>` identifier.
    pub fn prepare(&self, text: &str) -> EngineResult<String> {
        let id = self.statements.lock().prepare(text)?;
        debug!(statement = %id, "prepared statement");
        Ok(id)
    }

    /// Like [`prepare`](Self::prepare), with placeholder defaults
    /// consulted when execution leaves a placeholder unbound.
    pub fn prepare_with_defaults(
        &self,
        text: &str,
        defaults: HashMap<String, Value>,
    ) -> EngineResult<String> {
        let id = self.statements.lock().prepare_with_defaults(text, defaults)?;
        debug!(statement = %id, "prepared statement");
        Ok(id)
    }

    /// Executes the statement registered under `id` with `params` bound
    /// over its defaults, through the same select path (cache included)
    /// as a direct query.
    pub fn execute_prepared(
        &self,
        id: &str,
        params: &HashMap<String, Value>,
    ) -> EngineResult<Vec<Row>> {
        let (table, predicate) = {
            let statements = self.statements.lock();
            let statement = statements.get(id)?;
            (statement.table().to_owned(), statement.bind(params)?)
        };
        match predicate {
            Some(predicate) => self.select_with_cache(&table, &predicate),
            None => self.select_all(&table),
        }
    }

    // ---- locking helpers --------------------------------------------

    /// Runs `f` with `name`'s table locked, the per-table critical
    /// section every operation above goes through.
    fn with_table<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Table) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let tables = self.tables.read();
        let table = tables
            .get(name)
            .ok_or_else(|| EngineError::TableNotFound(name.to_owned()))?;
        let result = f(&mut table.lock());
        result
    }

    /// Runs `f` with both tables locked. Locks are taken in name order so
    /// two concurrent joins cannot deadlock; a self-join locks once.
    fn with_two_tables<T>(
        &self,
        left: &str,
        right: &str,
        f: impl FnOnce(&Table, &Table) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let tables = self.tables.read();
        let left_table = tables
            .get(left)
            .ok_or_else(|| EngineError::TableNotFound(left.to_owned()))?;
        if left == right {
            let guard = left_table.lock();
            return f(&guard, &guard);
        }
        let right_table = tables
            .get(right)
            .ok_or_else(|| EngineError::TableNotFound(right.to_owned()))?;
        if left < right {
            let l = left_table.lock();
            let r = right_table.lock();
            f(&l, &r)
        } else {
            let r = right_table.lock();
            let l = left_table.lock();
            f(&l, &r)
        }
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}
