//! Core type definitions for storage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of a stored row.
///
/// Keys are allocated by the engine at insert time, start at 1, increase
/// monotonically per table and are never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowKey(pub i64);

impl RowKey {
    /// Creates a new row key.
    #[must_use]
    pub const fn new(key: i64) -> Self {
        Self(key)
    }

    /// Returns the raw key value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RowKey {
    fn from(key: i64) -> Self {
        Self(key)
    }
}

/// Unique identifier for a unit of work.
///
/// Unit IDs are monotonically increasing and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub u64);

impl UnitId {
    /// Creates a new unit ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_key_ordering() {
        assert!(RowKey::new(1) < RowKey::new(2));
    }

    #[test]
    fn unit_id_display() {
        assert_eq!(format!("{}", UnitId::new(42)), "unit:42");
    }

    #[test]
    fn row_key_display_is_bare_number() {
        assert_eq!(RowKey::new(7).to_string(), "7");
    }
}
