//! # dyncrud storage
//!
//! Transactional storage engine seam for dyncrud.
//!
//! This crate is the lowest layer of the workspace. Engines store **opaque
//! byte rows** in named tables keyed by an auto-incrementing [`RowKey`]; they
//! never interpret row contents.
//!
//! ## Contract
//!
//! - All mutations go through a [`UnitOfWork`] obtained from
//!   [`StorageEngine::begin`]
//! - Writes are buffered and become visible to other readers only on commit
//! - Reads inside a unit see its own pending writes over committed state
//! - Keys are allocated at insert time and never reused, even on rollback
//! - Commit applies every pending write or none of them
//!
//! ## Available Engines
//!
//! - [`InMemoryEngine`] - For testing and ephemeral stores
//! - [`FileEngine`] - In-memory engine persisted as a snapshot file
//!
//! ## Example
//!
//! ```rust
//! use dyncrud_storage::{InMemoryEngine, StorageEngine};
//!
//! let engine = InMemoryEngine::new();
//! let mut unit = engine.begin().unwrap();
//! let key = engine.insert(&mut unit, "notes", b"hello".to_vec()).unwrap();
//! engine.commit(&mut unit).unwrap();
//!
//! let reader = engine.begin().unwrap();
//! assert_eq!(engine.get(&reader, "notes", key).unwrap(), Some(b"hello".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod file;
mod memory;
mod types;
mod unit;

pub use engine::StorageEngine;
pub use error::{StorageError, StorageResult};
pub use file::FileEngine;
pub use memory::{InMemoryEngine, Snapshot, Table};
pub use types::{RowKey, UnitId};
pub use unit::{PendingWrite, UnitOfWork, UnitState};
