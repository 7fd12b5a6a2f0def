//! CLI command implementations.

pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod transaction;
pub mod types;
pub mod update;

use crate::error::CliError;
use dyncrud_core::{
    Config, CoreError, Engine, FieldMap, FileEngine, InMemoryEngine, StorageEngine, TypeRegistry,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// The opened engine shared by every command.
pub struct Context {
    pub engine: Engine,
}

impl Context {
    /// Opens the store at `path`, or an in-memory store.
    ///
    /// With `documents_only`, every type is stored as a document.
    pub fn open(path: Option<&Path>, documents_only: bool) -> Result<Self, CliError> {
        let storage: Arc<dyn StorageEngine> = match path {
            Some(path) => {
                debug!(path = %path.display(), "opening store");
                Arc::new(FileEngine::open(path).map_err(CoreError::from)?)
            }
            None => {
                warn!("no --path given; changes are discarded on exit");
                Arc::new(InMemoryEngine::new())
            }
        };
        let config = Config::new().documents_only(documents_only);
        Ok(Self {
            engine: Engine::with_config(storage, TypeRegistry::builtin(), config),
        })
    }
}

/// Parses a `--fields` argument into a field map.
pub fn parse_fields(text: &str) -> Result<FieldMap, CliError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| CliError::bad_input("fields", e.to_string()))?;
    FieldMap::from_json(value).ok_or_else(|| CliError::bad_input("fields", "expected a JSON object"))
}

/// Splits a `KEY=VALUE` filter at the first `=`.
pub fn parse_filter(text: &str) -> Result<(String, String), CliError> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim().to_string(), value.to_string())),
        _ => Err(CliError::bad_input("filter", format!("expected KEY=VALUE, got {text:?}"))),
    }
}

/// Prints a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
