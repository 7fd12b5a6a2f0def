//! Unit-of-work state.

use crate::error::{StorageError, StorageResult};
use crate::types::{RowKey, UnitId};
use std::collections::BTreeMap;

/// State of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Unit is active and can perform operations.
    Active,
    /// Unit has been committed.
    Committed,
    /// Unit has been rolled back.
    RolledBack,
}

impl UnitState {
    fn describe(self) -> &'static str {
        match self {
            UnitState::Active => "active",
            UnitState::Committed => "already committed",
            UnitState::RolledBack => "already rolled back",
        }
    }
}

/// Represents a pending write in a unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingWrite {
    /// A row inserted by this unit.
    Insert {
        /// Row payload.
        payload: Vec<u8>,
    },
    /// Replacement payload for a committed row.
    Update {
        /// Row payload.
        payload: Vec<u8>,
    },
    /// Removal of a committed row.
    Remove,
}

impl PendingWrite {
    /// Returns the payload this write leaves behind, or `None` for a removal.
    #[must_use]
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            PendingWrite::Insert { payload } | PendingWrite::Update { payload } => Some(payload),
            PendingWrite::Remove => None,
        }
    }
}

/// An active unit of work.
///
/// Units buffer writes until commit. Nothing written through a unit is
/// visible to other readers before the engine commits it.
#[derive(Debug)]
pub struct UnitOfWork {
    /// Unit ID.
    id: UnitId,
    /// Identity of the engine that created this unit.
    engine: u64,
    /// Current state.
    state: UnitState,
    /// Pending writes: (table, key) -> write operation.
    writes: BTreeMap<(String, RowKey), PendingWrite>,
}

impl UnitOfWork {
    /// Creates a new unit of work.
    pub(crate) fn new(id: UnitId, engine: u64) -> Self {
        Self {
            id,
            engine,
            state: UnitState::Active,
            writes: BTreeMap::new(),
        }
    }

    /// Returns the unit ID.
    #[must_use]
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Checks if the unit is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == UnitState::Active
    }

    /// Returns the number of pending writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// Gets the pending write for a row.
    #[must_use]
    pub fn get_pending_write(&self, table: &str, key: RowKey) -> Option<&PendingWrite> {
        self.writes.get(&(table.to_string(), key))
    }

    /// Returns all pending writes in (table, key) order.
    pub fn pending_writes(&self) -> impl Iterator<Item = (&(String, RowKey), &PendingWrite)> {
        self.writes.iter()
    }

    pub(crate) fn engine(&self) -> u64 {
        self.engine
    }

    pub(crate) fn record_insert(
        &mut self,
        table: &str,
        key: RowKey,
        payload: Vec<u8>,
    ) -> StorageResult<()> {
        self.ensure_active()?;
        self.writes
            .insert((table.to_string(), key), PendingWrite::Insert { payload });
        Ok(())
    }

    /// Records an update. An update of a row inserted by this unit stays an
    /// insert.
    pub(crate) fn record_update(
        &mut self,
        table: &str,
        key: RowKey,
        payload: Vec<u8>,
    ) -> StorageResult<()> {
        self.ensure_active()?;
        let slot = (table.to_string(), key);
        let write = match self.writes.get(&slot) {
            Some(PendingWrite::Insert { .. }) => PendingWrite::Insert { payload },
            _ => PendingWrite::Update { payload },
        };
        self.writes.insert(slot, write);
        Ok(())
    }

    /// Records a removal. Removing a row inserted by this unit simply forgets
    /// the insert.
    pub(crate) fn record_remove(&mut self, table: &str, key: RowKey) -> StorageResult<()> {
        self.ensure_active()?;
        let slot = (table.to_string(), key);
        if let Some(PendingWrite::Insert { .. }) = self.writes.get(&slot) {
            self.writes.remove(&slot);
        } else {
            self.writes.insert(slot, PendingWrite::Remove);
        }
        Ok(())
    }

    /// Merges this unit's pending writes for `table` over committed rows.
    pub(crate) fn overlay(
        &self,
        table: &str,
        mut committed: BTreeMap<RowKey, Vec<u8>>,
    ) -> Vec<(RowKey, Vec<u8>)> {
        for ((_, key), write) in self
            .writes
            .iter()
            .filter(|((name, _), _)| name.as_str() == table)
        {
            match write.payload() {
                Some(payload) => {
                    committed.insert(*key, payload.to_vec());
                }
                None => {
                    committed.remove(key);
                }
            }
        }
        committed.into_iter().collect()
    }

    pub(crate) fn mark_committed(&mut self) {
        self.state = UnitState::Committed;
        self.writes.clear();
    }

    pub(crate) fn mark_rolled_back(&mut self) {
        self.state = UnitState::RolledBack;
        self.writes.clear();
    }

    /// Ensures the unit is active.
    pub(crate) fn ensure_active(&self) -> StorageResult<()> {
        match self.state {
            UnitState::Active => Ok(()),
            state => Err(StorageError::UnitNotActive {
                state: state.describe(),
            }),
        }
    }
}
