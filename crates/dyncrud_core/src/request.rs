//! Multi-object create requests.

use crate::error::{CoreError, CoreResult};
use crate::fields::FieldMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Key under which a typed create may embed its sub-objects.
pub const SUB_OBJECTS: &str = "SubObjects";

/// A dependent object created together with a master.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubObject {
    /// Type name of the dependent.
    pub object_type: String,
    /// Fields of the dependent.
    #[serde(default)]
    pub fields: FieldMap,
}

impl SubObject {
    /// Creates a sub-object.
    pub fn new(object_type: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            object_type: object_type.into(),
            fields,
        }
    }

    /// Removes an embedded `SubObjects` array from a field map and parses
    /// it.
    ///
    /// The key is matched ignoring ASCII case. A map without it yields an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Returns `ValidationMismatch` if the embedded value is not an array of
    /// `{objectType, fields}` objects.
    pub fn take_embedded(fields: &mut FieldMap) -> CoreResult<Vec<SubObject>> {
        match fields.remove_ignore_case(SUB_OBJECTS) {
            None | Some((_, JsonValue::Null)) => Ok(Vec::new()),
            Some((key, value)) => serde_json::from_value(value).map_err(|e| {
                CoreError::validation_mismatch(format!(
                    "{key} must be an array of {{objectType, fields}} objects: {e}"
                ))
            }),
        }
    }
}

/// A master object with its dependents, created in one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// Type name of the master.
    pub master_object_type: String,
    /// Fields of the master.
    pub master_fields: FieldMap,
    /// Dependents, created in order after the master.
    #[serde(default)]
    pub sub_objects: Vec<SubObject>,
}
