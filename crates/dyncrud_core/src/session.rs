//! Request-scoped storage sessions.

use crate::error::CoreResult;
use dyncrud_storage::{RowKey, StorageEngine, UnitId, UnitOfWork};
use tracing::{trace, warn};

/// A storage session for one request.
///
/// Wraps a unit of work on a shared engine. Every read and write of the
/// request goes through the same session, so the request sees its own
/// writes and nothing else uncommitted. A session dropped without `commit`
/// rolls back.
pub struct Session<'e> {
    engine: &'e dyn StorageEngine,
    unit: UnitOfWork,
}

impl<'e> Session<'e> {
    /// Begins a session on an engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot start a unit of work.
    pub fn begin(engine: &'e dyn StorageEngine) -> CoreResult<Self> {
        let unit = engine.begin()?;
        trace!(unit = %unit.id(), "session started");
        Ok(Self { engine, unit })
    }

    /// Returns the id of the underlying unit of work.
    #[must_use]
    pub fn id(&self) -> UnitId {
        self.unit.id()
    }

    /// Returns the number of writes pending in this session.
    #[must_use]
    pub fn pending_writes(&self) -> usize {
        self.unit.write_count()
    }

    /// Inserts a row, returning its newly allocated key.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the write.
    pub fn insert(&mut self, table: &str, payload: Vec<u8>) -> CoreResult<RowKey> {
        Ok(self.engine.insert(&mut self.unit, table, payload)?)
    }

    /// Replaces a row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row is not visible to this session.
    pub fn update(&mut self, table: &str, key: RowKey, payload: Vec<u8>) -> CoreResult<()> {
        Ok(self.engine.update(&mut self.unit, table, key, payload)?)
    }

    /// Removes a row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row is not visible to this session.
    pub fn remove(&mut self, table: &str, key: RowKey) -> CoreResult<()> {
        Ok(self.engine.remove(&mut self.unit, table, key)?)
    }

    /// Reads a row.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    pub fn get(&self, table: &str, key: RowKey) -> CoreResult<Option<Vec<u8>>> {
        Ok(self.engine.get(&self.unit, table, key)?)
    }

    /// Reads every row of a table in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    pub fn scan(&self, table: &str) -> CoreResult<Vec<(RowKey, Vec<u8>)>> {
        Ok(self.engine.scan(&self.unit, table)?)
    }

    /// Commits every write of the session atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses the commit; nothing is
    /// applied in that case.
    pub fn commit(mut self) -> CoreResult<()> {
        let writes = self.unit.write_count();
        self.engine.commit(&mut self.unit)?;
        trace!(unit = %self.unit.id(), writes, "session committed");
        Ok(())
    }

    /// Discards every write of the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit is no longer active.
    pub fn rollback(mut self) -> CoreResult<()> {
        self.engine.rollback(&mut self.unit)?;
        trace!(unit = %self.unit.id(), "session rolled back");
        Ok(())
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if self.unit.is_active() {
            if let Err(e) = self.engine.rollback(&mut self.unit) {
                warn!(unit = %self.unit.id(), error = %e, "rollback of abandoned session failed");
            }
        }
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("unit", &self.unit.id())
            .field("pending_writes", &self.unit.write_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyncrud_storage::InMemoryEngine;

    #[test]
    fn dropped_session_rolls_back() {
        let engine = InMemoryEngine::new();
        {
            let mut session = Session::begin(&engine).unwrap();
            session.insert("t", vec![1]).unwrap();
        }
        assert_eq!(engine.row_count("t"), 0);
    }

    #[test]
    fn commit_publishes_writes() {
        let engine = InMemoryEngine::new();
        let mut session = Session::begin(&engine).unwrap();
        let key = session.insert("t", vec![1]).unwrap();
        assert_eq!(session.get("t", key).unwrap(), Some(vec![1]));
        session.commit().unwrap();

        let reader = Session::begin(&engine).unwrap();
        assert_eq!(reader.scan("t").unwrap(), vec![(key, vec![1])]);
    }

    #[test]
    fn sessions_are_isolated() {
        let engine = InMemoryEngine::new();
        let mut writer = Session::begin(&engine).unwrap();
        let key = writer.insert("t", vec![1]).unwrap();

        let reader = Session::begin(&engine).unwrap();
        assert_eq!(reader.get("t", key).unwrap(), None);
        writer.rollback().unwrap();
    }
}
