//! Storage engine trait definition.

use crate::error::StorageResult;
use crate::types::RowKey;
use crate::unit::UnitOfWork;

/// A transactional table store.
///
/// Engines hold **opaque byte rows** in named tables. They provide the four
/// capabilities the entity engine consumes: a unit of work with
/// begin/commit/rollback, per-table auto-increment keys, add/update/remove
/// of single rows, and table scans.
///
/// # Invariants
///
/// - Tables are created implicitly by their first insert
/// - `insert` returns a key never handed out before for that table
/// - Writes through a unit are invisible to other units until `commit`
/// - `commit` applies all pending writes or none
/// - Engines must be `Send + Sync` so one engine can serve many requests
///
/// # Implementors
///
/// - [`super::InMemoryEngine`] - For testing
/// - [`super::FileEngine`] - For persistent storage
pub trait StorageEngine: Send + Sync {
    /// Begins a new unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot start a unit.
    fn begin(&self) -> StorageResult<UnitOfWork>;

    /// Inserts a row, allocating its key immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit is not active.
    fn insert(&self, unit: &mut UnitOfWork, table: &str, payload: Vec<u8>)
        -> StorageResult<RowKey>;

    /// Replaces the payload of an existing row.
    ///
    /// # Errors
    ///
    /// Returns `RowNotFound` if the row is not visible to the unit.
    fn update(
        &self,
        unit: &mut UnitOfWork,
        table: &str,
        key: RowKey,
        payload: Vec<u8>,
    ) -> StorageResult<()>;

    /// Removes an existing row.
    ///
    /// # Errors
    ///
    /// Returns `RowNotFound` if the row is not visible to the unit.
    fn remove(&self, unit: &mut UnitOfWork, table: &str, key: RowKey) -> StorageResult<()>;

    /// Reads a row as seen by the unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit does not belong to this engine.
    fn get(&self, unit: &UnitOfWork, table: &str, key: RowKey) -> StorageResult<Option<Vec<u8>>>;

    /// Returns every row of a table as seen by the unit, in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit does not belong to this engine.
    fn scan(&self, unit: &UnitOfWork, table: &str) -> StorageResult<Vec<(RowKey, Vec<u8>)>>;

    /// Commits the unit's pending writes atomically.
    ///
    /// # Errors
    ///
    /// Returns an error, leaving committed state untouched, if any pending
    /// update or removal targets a row that no longer exists.
    fn commit(&self, unit: &mut UnitOfWork) -> StorageResult<()>;

    /// Discards the unit's pending writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit is not active.
    fn rollback(&self, unit: &mut UnitOfWork) -> StorageResult<()>;

    /// Returns the names of all tables holding committed rows, in name order.
    fn tables(&self) -> Vec<String>;
}
