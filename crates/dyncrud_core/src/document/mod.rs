//! The schema-less document path.
//!
//! Documents are stored as rows of `(objectType, payload, createdAt)` keyed
//! by the row key. The payload is the caller's field map serialized as JSON;
//! nothing about its contents is enforced beyond registered required fields.

mod matching;
mod store;

pub use matching::{loosely_equals, own_key, scalar_text, PARENT_ID};
pub use store::DocumentStore;

use crate::error::{CoreError, CoreResult};
use crate::fields::FieldMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Storage-assigned id.
    pub id: i64,
    /// Type name, always lowercase.
    pub object_type: String,
    /// The field map as JSON text.
    pub payload: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Parses the payload back into a field map.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if the payload is not a JSON object.
    pub fn fields(&self) -> CoreResult<FieldMap> {
        FieldMap::parse(&self.payload).map_err(|e| CoreError::invalid_payload(self.id, e.to_string()))
    }
}

/// A document row as stored; the id is the row key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct DocumentRow {
    object_type: String,
    payload: String,
    created_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_document(self, id: i64) -> Document {
        Document {
            id,
            object_type: self.object_type,
            payload: self.payload,
            created_at: self.created_at,
        }
    }
}
