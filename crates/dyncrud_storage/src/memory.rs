//! In-memory storage engine.

use crate::engine::StorageEngine;
use crate::error::{StorageError, StorageResult};
use crate::types::{RowKey, UnitId};
use crate::unit::{PendingWrite, UnitOfWork};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of engine identities, used to reject units from other engines.
static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

/// A table of committed rows plus its key sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Last key handed out (0 when none has been).
    last_key: i64,
    /// Committed rows in key order.
    rows: BTreeMap<RowKey, Vec<u8>>,
}

impl Table {
    /// Returns the number of committed rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table holds no committed rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the last key allocated for this table.
    #[must_use]
    pub fn last_key(&self) -> RowKey {
        RowKey::new(self.last_key)
    }

    fn allocate(&mut self) -> RowKey {
        self.last_key += 1;
        RowKey::new(self.last_key)
    }
}

/// A point-in-time copy of every table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    tables: BTreeMap<String, Table>,
}

impl Snapshot {
    /// Returns the table with the given name, if it exists.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}

/// An in-memory storage engine.
///
/// This engine keeps every table in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral stores that don't need persistence
///
/// # Thread Safety
///
/// Committed state sits behind a single `RwLock`; commit takes the write
/// lock for validation and application together, so readers observe either
/// none or all of a unit's writes.
///
/// # Example
///
/// ```rust
/// use dyncrud_storage::{InMemoryEngine, StorageEngine};
///
/// let engine = InMemoryEngine::new();
/// let mut unit = engine.begin().unwrap();
/// let first = engine.insert(&mut unit, "t", vec![1]).unwrap();
/// let second = engine.insert(&mut unit, "t", vec![2]).unwrap();
/// assert_eq!(first.as_i64(), 1);
/// assert_eq!(second.as_i64(), 2);
/// ```
#[derive(Debug)]
pub struct InMemoryEngine {
    id: u64,
    tables: RwLock<BTreeMap<String, Table>>,
    next_unit: AtomicU64,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::from_snapshot(Snapshot::default())
    }
}

impl InMemoryEngine {
    /// Creates a new empty in-memory engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine holding the tables of a snapshot.
    ///
    /// Useful for restoring persisted state.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            id: NEXT_ENGINE_ID.fetch_add(1, Ordering::SeqCst),
            tables: RwLock::new(snapshot.tables),
            next_unit: AtomicU64::new(1),
        }
    }

    /// Returns a copy of all committed state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tables: self.tables.read().clone(),
        }
    }

    /// Returns the number of committed rows in a table.
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, Table::len)
    }

    fn ensure_owned(&self, unit: &UnitOfWork) -> StorageResult<()> {
        if unit.engine() == self.id {
            Ok(())
        } else {
            Err(StorageError::ForeignUnit {
                unit: unit.id().as_u64(),
            })
        }
    }

    fn visible(&self, unit: &UnitOfWork, table: &str, key: RowKey) -> bool {
        match unit.get_pending_write(table, key) {
            Some(write) => write.payload().is_some(),
            None => self
                .tables
                .read()
                .get(table)
                .is_some_and(|t| t.rows.contains_key(&key)),
        }
    }
}

/// Checks that every pending update or remove targets a committed row.
fn check_targets(tables: &BTreeMap<String, Table>, unit: &UnitOfWork) -> StorageResult<()> {
    for ((table, key), write) in unit.pending_writes() {
        if matches!(write, PendingWrite::Update { .. } | PendingWrite::Remove) {
            let exists = tables.get(table).is_some_and(|t| t.rows.contains_key(key));
            if !exists {
                return Err(StorageError::row_not_found(table.as_str(), *key));
            }
        }
    }
    Ok(())
}

fn apply_writes(tables: &mut BTreeMap<String, Table>, unit: &UnitOfWork) {
    for ((table, key), write) in unit.pending_writes() {
        let target = tables.entry(table.clone()).or_default();
        match write {
            PendingWrite::Insert { payload } | PendingWrite::Update { payload } => {
                target.rows.insert(*key, payload.clone());
            }
            PendingWrite::Remove => {
                target.rows.remove(key);
            }
        }
    }
}

impl InMemoryEngine {
    /// Commits a unit only once `stage` accepts the resulting state.
    ///
    /// The unit's writes are applied to a copy of the committed tables and
    /// handed to `stage` while the write lock is held. Committed state is
    /// replaced by the copy only if `stage` succeeds; otherwise nothing is
    /// visible and the unit stays active so it can be rolled back.
    pub(crate) fn commit_staged<F>(&self, unit: &mut UnitOfWork, stage: F) -> StorageResult<()>
    where
        F: FnOnce(&Snapshot) -> StorageResult<()>,
    {
        self.ensure_owned(unit)?;
        unit.ensure_active()?;

        let mut tables = self.tables.write();
        check_targets(&tables, unit)?;
        let mut next = Snapshot {
            tables: tables.clone(),
        };
        apply_writes(&mut next.tables, unit);
        stage(&next)?;
        *tables = next.tables;
        drop(tables);

        unit.mark_committed();
        Ok(())
    }
}

impl StorageEngine for InMemoryEngine {
    fn begin(&self) -> StorageResult<UnitOfWork> {
        let id = UnitId::new(self.next_unit.fetch_add(1, Ordering::SeqCst));
        Ok(UnitOfWork::new(id, self.id))
    }

    fn insert(
        &self,
        unit: &mut UnitOfWork,
        table: &str,
        payload: Vec<u8>,
    ) -> StorageResult<RowKey> {
        self.ensure_owned(unit)?;
        unit.ensure_active()?;
        let key = self
            .tables
            .write()
            .entry(table.to_string())
            .or_default()
            .allocate();
        unit.record_insert(table, key, payload)?;
        Ok(key)
    }

    fn update(
        &self,
        unit: &mut UnitOfWork,
        table: &str,
        key: RowKey,
        payload: Vec<u8>,
    ) -> StorageResult<()> {
        self.ensure_owned(unit)?;
        if !self.visible(unit, table, key) {
            return Err(StorageError::row_not_found(table, key));
        }
        unit.record_update(table, key, payload)
    }

    fn remove(&self, unit: &mut UnitOfWork, table: &str, key: RowKey) -> StorageResult<()> {
        self.ensure_owned(unit)?;
        if !self.visible(unit, table, key) {
            return Err(StorageError::row_not_found(table, key));
        }
        unit.record_remove(table, key)
    }

    fn get(&self, unit: &UnitOfWork, table: &str, key: RowKey) -> StorageResult<Option<Vec<u8>>> {
        self.ensure_owned(unit)?;
        if let Some(write) = unit.get_pending_write(table, key) {
            return Ok(write.payload().map(<[u8]>::to_vec));
        }
        Ok(self
            .tables
            .read()
            .get(table)
            .and_then(|t| t.rows.get(&key).cloned()))
    }

    fn scan(&self, unit: &UnitOfWork, table: &str) -> StorageResult<Vec<(RowKey, Vec<u8>)>> {
        self.ensure_owned(unit)?;
        let committed = self
            .tables
            .read()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default();
        Ok(unit.overlay(table, committed))
    }

    fn commit(&self, unit: &mut UnitOfWork) -> StorageResult<()> {
        self.ensure_owned(unit)?;
        unit.ensure_active()?;

        let mut tables = self.tables.write();
        check_targets(&tables, unit)?;
        apply_writes(&mut tables, unit);
        drop(tables);

        unit.mark_committed();
        Ok(())
    }

    fn rollback(&self, unit: &mut UnitOfWork) -> StorageResult<()> {
        self.ensure_owned(unit)?;
        unit.ensure_active()?;
        unit.mark_rolled_back();
        Ok(())
    }

    fn tables(&self) -> Vec<String> {
        self.tables
            .read()
            .iter()
            .filter(|(_, table)| !table.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed_row(engine: &InMemoryEngine, table: &str, payload: Vec<u8>) -> RowKey {
        let mut unit = engine.begin().unwrap();
        let key = engine.insert(&mut unit, table, payload).unwrap();
        engine.commit(&mut unit).unwrap();
        key
    }

    #[test]
    fn keys_start_at_one_and_increase() {
        let engine = InMemoryEngine::new();
        assert_eq!(committed_row(&engine, "t", vec![1]), RowKey::new(1));
        assert_eq!(committed_row(&engine, "t", vec![2]), RowKey::new(2));
        assert_eq!(committed_row(&engine, "other", vec![3]), RowKey::new(1));
    }

    #[test]
    fn uncommitted_insert_is_invisible_to_other_units() {
        let engine = InMemoryEngine::new();
        let mut writer = engine.begin().unwrap();
        let key = engine.insert(&mut writer, "t", vec![7]).unwrap();

        let reader = engine.begin().unwrap();
        assert_eq!(engine.get(&reader, "t", key).unwrap(), None);
        assert_eq!(engine.get(&writer, "t", key).unwrap(), Some(vec![7]));
    }

    #[test]
    fn rollback_discards_writes_but_not_keys() {
        let engine = InMemoryEngine::new();
        let mut unit = engine.begin().unwrap();
        let key = engine.insert(&mut unit, "t", vec![1]).unwrap();
        engine.rollback(&mut unit).unwrap();

        assert_eq!(engine.row_count("t"), 0);
        assert_eq!(committed_row(&engine, "t", vec![2]), RowKey::new(key.as_i64() + 1));
    }

    #[test]
    fn update_missing_row_fails() {
        let engine = InMemoryEngine::new();
        let mut unit = engine.begin().unwrap();
        let result = engine.update(&mut unit, "t", RowKey::new(5), vec![]);
        assert!(matches!(result, Err(StorageError::RowNotFound { .. })));
    }

    #[test]
    fn commit_is_all_or_nothing() {
        let engine = InMemoryEngine::new();
        let key = committed_row(&engine, "t", vec![1]);

        let mut first = engine.begin().unwrap();
        let mut second = engine.begin().unwrap();
        engine.remove(&mut first, "t", key).unwrap();
        engine.insert(&mut second, "t", vec![9]).unwrap();
        engine.update(&mut second, "t", key, vec![2]).unwrap();

        engine.commit(&mut first).unwrap();
        let result = engine.commit(&mut second);
        assert!(matches!(result, Err(StorageError::RowNotFound { .. })));
        assert_eq!(engine.row_count("t"), 0);
    }

    #[test]
    fn scan_sees_own_writes() {
        let engine = InMemoryEngine::new();
        let kept = committed_row(&engine, "t", vec![1]);
        let dropped = committed_row(&engine, "t", vec![2]);

        let mut unit = engine.begin().unwrap();
        engine.remove(&mut unit, "t", dropped).unwrap();
        engine.update(&mut unit, "t", kept, vec![10]).unwrap();
        let added = engine.insert(&mut unit, "t", vec![3]).unwrap();

        let rows = engine.scan(&unit, "t").unwrap();
        assert_eq!(rows, vec![(kept, vec![10]), (added, vec![3])]);
    }

    #[test]
    fn foreign_unit_is_rejected() {
        let a = InMemoryEngine::new();
        let b = InMemoryEngine::new();
        let mut unit = a.begin().unwrap();
        let result = b.insert(&mut unit, "t", vec![]);
        assert!(matches!(result, Err(StorageError::ForeignUnit { .. })));
    }

    #[test]
    fn snapshot_restores_tables_and_sequences() {
        let engine = InMemoryEngine::new();
        committed_row(&engine, "t", vec![1]);
        committed_row(&engine, "t", vec![2]);

        let restored = InMemoryEngine::from_snapshot(engine.snapshot());
        assert_eq!(restored.row_count("t"), 2);
        assert_eq!(committed_row(&restored, "t", vec![3]), RowKey::new(3));
    }

    #[test]
    fn rolled_back_insert_leaves_no_table_behind() {
        let engine = InMemoryEngine::new();
        let mut unit = engine.begin().unwrap();
        engine.insert(&mut unit, "fresh", vec![1]).unwrap();
        engine.rollback(&mut unit).unwrap();
        assert!(engine.tables().is_empty());

        let key = committed_row(&engine, "fresh", vec![2]);
        assert_eq!(key, RowKey::new(2));
        assert_eq!(engine.tables(), vec!["fresh".to_string()]);
    }

    #[test]
    fn rejected_stage_keeps_committed_state() {
        let engine = InMemoryEngine::new();
        let kept = committed_row(&engine, "t", vec![1]);

        let mut unit = engine.begin().unwrap();
        engine.insert(&mut unit, "t", vec![2]).unwrap();
        engine.remove(&mut unit, "t", kept).unwrap();
        let result = engine.commit_staged(&mut unit, |next| {
            assert_eq!(next.table("t").map(Table::len), Some(1));
            Err(StorageError::Encoding("refused".into()))
        });

        assert!(matches!(result, Err(StorageError::Encoding(_))));
        let reader = engine.begin().unwrap();
        assert_eq!(engine.scan(&reader, "t").unwrap(), vec![(kept, vec![1])]);
        engine.rollback(&mut unit).unwrap();
    }

    #[test]
    fn unit_cannot_commit_twice() {
        let engine = InMemoryEngine::new();
        let mut unit = engine.begin().unwrap();
        engine.commit(&mut unit).unwrap();
        assert!(engine.commit(&mut unit).is_err());
    }
}
