//! Error types for dyncrud core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Stable classification of an error for the request-handling layer.
///
/// The classification sits on top of the structured error; it never
/// replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// The caller sent something the engine cannot accept.
    BadRequest,
    /// No record or document exists for the given identity.
    NotFound,
    /// The request conflicts with existing data.
    Conflict,
    /// The engine or its storage failed.
    Internal,
}

impl ErrorStatus {
    /// Returns the lowercase name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorStatus::BadRequest => "bad_request",
            ErrorStatus::NotFound => "not_found",
            ErrorStatus::Conflict => "conflict",
            ErrorStatus::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in dyncrud core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage engine error.
    #[error("storage error: {0}")]
    Storage(#[from] dyncrud_storage::StorageError),

    /// JSON payload error.
    #[error("payload error: {0}")]
    Json(#[from] serde_json::Error),

    /// CBOR row encoding or decoding error.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the codec failure.
        message: String,
    },

    /// The type name matches no registered descriptor.
    #[error("unknown object type '{name}'; available types are: {}", known.join(", "))]
    UnknownType {
        /// The name that was requested.
        name: String,
        /// Every registered type name.
        known: Vec<String>,
    },

    /// Required fields are absent from a field map.
    #[error("missing required fields for {type_name}: {}", fields.join(", "))]
    MissingFields {
        /// The type being validated.
        type_name: String,
        /// Every absent required field, in declaration order.
        fields: Vec<String>,
    },

    /// A field value cannot be coerced to its declared type.
    #[error("cannot convert field '{field}' from {from} to {to} (value: {value})")]
    Conversion {
        /// The offending field.
        field: String,
        /// The source type.
        from: String,
        /// The declared target type.
        to: String,
        /// The rejected value.
        value: String,
    },

    /// A filter value cannot be coerced to its field's declared type.
    #[error("cannot filter field '{field}': {value:?} is not a valid {to} (from {from})")]
    FilterConversion {
        /// The filtered field.
        field: String,
        /// The source type.
        from: String,
        /// The declared target type.
        to: String,
        /// The rejected filter value.
        value: String,
    },

    /// No record or document exists for the given identity.
    #[error("{type_name} with id {id} not found")]
    NotFound {
        /// The type searched.
        type_name: String,
        /// The missing id.
        id: i64,
    },

    /// Related inputs disagree, e.g. a sub-object's parent reference.
    #[error("validation mismatch: {message}")]
    ValidationMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// A foreign key would point at a missing row, or a restricted
    /// dependent still points at a row being deleted.
    #[error("reference violation on {type_name}.{field} = {id} ({references})")]
    ReferenceViolation {
        /// The type holding the foreign key.
        type_name: String,
        /// The foreign-key field.
        field: String,
        /// The key value involved.
        id: i64,
        /// Description of the violated reference.
        references: String,
    },

    /// A stored document payload is not a field map.
    #[error("document {id} has an invalid payload: {message}")]
    InvalidPayload {
        /// The document id.
        id: i64,
        /// Description of the problem.
        message: String,
    },

    /// A transactional batch failed and every write was rolled back.
    #[error("transaction aborted: {source}")]
    Aborted {
        /// The error that triggered the rollback.
        source: Box<CoreError>,
    },
}

impl CoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(type_name: impl Into<String>, id: i64) -> Self {
        Self::NotFound {
            type_name: type_name.into(),
            id,
        }
    }

    /// Creates a validation mismatch error.
    pub fn validation_mismatch(message: impl Into<String>) -> Self {
        Self::ValidationMismatch {
            message: message.into(),
        }
    }

    /// Creates an invalid payload error.
    pub fn invalid_payload(id: i64, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            id,
            message: message.into(),
        }
    }

    /// Wraps an error as the cause of an aborted transaction.
    ///
    /// An error that is already `Aborted` is returned unchanged.
    #[must_use]
    pub fn aborted(cause: CoreError) -> Self {
        match cause {
            aborted @ CoreError::Aborted { .. } => aborted,
            other => Self::Aborted {
                source: Box::new(other),
            },
        }
    }

    /// Returns the error that ultimately caused this one.
    #[must_use]
    pub fn root_cause(&self) -> &CoreError {
        match self {
            CoreError::Aborted { source } => source.root_cause(),
            other => other,
        }
    }

    /// Returns the stable status classification of this error.
    #[must_use]
    pub fn status(&self) -> ErrorStatus {
        match self {
            CoreError::UnknownType { .. }
            | CoreError::MissingFields { .. }
            | CoreError::Conversion { .. }
            | CoreError::FilterConversion { .. }
            | CoreError::ValidationMismatch { .. } => ErrorStatus::BadRequest,
            CoreError::NotFound { .. } => ErrorStatus::NotFound,
            CoreError::ReferenceViolation { .. } => ErrorStatus::Conflict,
            CoreError::Storage(dyncrud_storage::StorageError::RowNotFound { .. }) => {
                ErrorStatus::Conflict
            }
            CoreError::Aborted { source } => source.status(),
            CoreError::Storage(_)
            | CoreError::Json(_)
            | CoreError::Codec { .. }
            | CoreError::InvalidPayload { .. } => ErrorStatus::Internal,
        }
    }
}
