//! File-backed storage engine for persistent stores.

use crate::engine::StorageEngine;
use crate::error::{StorageError, StorageResult};
use crate::memory::{InMemoryEngine, Snapshot};
use crate::types::RowKey;
use crate::unit::UnitOfWork;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A storage engine persisted as a single snapshot file.
///
/// Rows live in an [`InMemoryEngine`]. A commit writes the full state with
/// the unit applied as CBOR to a temporary file next to the target and
/// renames it over the target; only then do the writes become visible. The
/// file on disk always holds a complete snapshot.
///
/// # Durability
///
/// The temporary file is synced before the rename. If writing fails, the
/// commit returns the error and neither memory nor disk changes.
///
/// # Example
///
/// ```no_run
/// use dyncrud_storage::{FileEngine, StorageEngine};
/// use std::path::Path;
///
/// let engine = FileEngine::open(Path::new("store.dyncrud")).unwrap();
/// let mut unit = engine.begin().unwrap();
/// engine.insert(&mut unit, "notes", b"persistent".to_vec()).unwrap();
/// engine.commit(&mut unit).unwrap();
/// ```
#[derive(Debug)]
pub struct FileEngine {
    path: PathBuf,
    inner: InMemoryEngine,
    persist_lock: Mutex<()>,
}

impl FileEngine {
    /// Opens the snapshot at `path`, or starts empty if it doesn't exist.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let snapshot = if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            ciborium::de::from_reader(reader)
                .map_err(|e| StorageError::Corrupted(e.to_string()))?
        } else {
            Snapshot::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            inner: InMemoryEngine::from_snapshot(snapshot),
            persist_lock: Mutex::new(()),
        })
    }

    /// Returns the path to the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of committed rows in a table.
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.inner.row_count(table)
    }

    /// Writes the current state to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be encoded or written.
    pub fn persist(&self) -> StorageResult<()> {
        self.write_snapshot(&self.inner.snapshot())
    }

    fn write_snapshot(&self, snapshot: &Snapshot) -> StorageResult<()> {
        let _guard = self.persist_lock.lock();

        let mut bytes = Vec::new();
        ciborium::ser::into_writer(snapshot, &mut bytes)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }
}

impl StorageEngine for FileEngine {
    fn begin(&self) -> StorageResult<UnitOfWork> {
        self.inner.begin()
    }

    fn insert(
        &self,
        unit: &mut UnitOfWork,
        table: &str,
        payload: Vec<u8>,
    ) -> StorageResult<RowKey> {
        self.inner.insert(unit, table, payload)
    }

    fn update(
        &self,
        unit: &mut UnitOfWork,
        table: &str,
        key: RowKey,
        payload: Vec<u8>,
    ) -> StorageResult<()> {
        self.inner.update(unit, table, key, payload)
    }

    fn remove(&self, unit: &mut UnitOfWork, table: &str, key: RowKey) -> StorageResult<()> {
        self.inner.remove(unit, table, key)
    }

    fn get(&self, unit: &UnitOfWork, table: &str, key: RowKey) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(unit, table, key)
    }

    fn scan(&self, unit: &UnitOfWork, table: &str) -> StorageResult<Vec<(RowKey, Vec<u8>)>> {
        self.inner.scan(unit, table)
    }

    fn commit(&self, unit: &mut UnitOfWork) -> StorageResult<()> {
        if unit.write_count() == 0 {
            return self.inner.commit(unit);
        }
        self.inner
            .commit_staged(unit, |snapshot| self.write_snapshot(snapshot))
    }

    fn rollback(&self, unit: &mut UnitOfWork) -> StorageResult<()> {
        self.inner.rollback(unit)
    }

    fn tables(&self) -> Vec<String> {
        self.inner.tables()
    }
}
