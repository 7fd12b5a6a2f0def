//! All-or-nothing execution of multi-write requests.

use crate::error::{CoreError, CoreResult};
use crate::session::Session;
use dyncrud_storage::{RowKey, StorageEngine};
use tracing::{debug, warn};

/// One write of a transactional batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert a new row.
    Insert {
        /// Target table.
        table: String,
        /// Encoded row.
        payload: Vec<u8>,
    },
    /// Replace an existing row.
    Update {
        /// Target table.
        table: String,
        /// Row key.
        key: RowKey,
        /// Encoded row.
        payload: Vec<u8>,
    },
    /// Remove an existing row.
    Remove {
        /// Target table.
        table: String,
        /// Row key.
        key: RowKey,
    },
}

/// Runs groups of writes in a single session.
///
/// Either every write commits or none does. Any failure rolls the session
/// back and comes back as [`CoreError::Aborted`] carrying the cause.
#[derive(Clone, Copy)]
pub struct TransactionCoordinator<'e> {
    engine: &'e dyn StorageEngine,
}

impl<'e> TransactionCoordinator<'e> {
    /// Creates a coordinator on an engine.
    #[must_use]
    pub fn new(engine: &'e dyn StorageEngine) -> Self {
        Self { engine }
    }

    /// Runs `f` in a fresh session and commits if it succeeds.
    ///
    /// # Errors
    ///
    /// Returns `Aborted` wrapping the error from `f`, from starting the
    /// session, or from the commit.
    pub fn run<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Session<'e>) -> CoreResult<T>,
    {
        let mut session = Session::begin(self.engine).map_err(CoreError::aborted)?;
        let unit = session.id();

        match f(&mut session) {
            Ok(result) => {
                session.commit().map_err(|e| {
                    warn!(%unit, error = %e, "transaction commit failed");
                    CoreError::aborted(e)
                })?;
                debug!(%unit, "transaction committed");
                Ok(result)
            }
            Err(e) => {
                warn!(%unit, error = %e, "transaction failed; rolling back");
                if let Err(rollback) = session.rollback() {
                    warn!(%unit, error = %rollback, "rollback after aborted transaction failed");
                }
                Err(CoreError::aborted(e))
            }
        }
    }

    /// Applies a batch of writes atomically.
    ///
    /// Returns one entry per write: the allocated key for inserts, `None`
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns `Aborted` wrapping the first failure; no write is applied.
    pub fn run_transactional(&self, writes: Vec<WriteOp>) -> CoreResult<Vec<Option<RowKey>>> {
        self.run(|session| {
            writes
                .into_iter()
                .map(|write| match write {
                    WriteOp::Insert { table, payload } => session.insert(&table, payload).map(Some),
                    WriteOp::Update {
                        table,
                        key,
                        payload,
                    } => session.update(&table, key, payload).map(|()| None),
                    WriteOp::Remove { table, key } => session.remove(&table, key).map(|()| None),
                })
                .collect()
        })
    }
}

impl std::fmt::Debug for TransactionCoordinator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionCoordinator").finish_non_exhaustive()
    }
}
