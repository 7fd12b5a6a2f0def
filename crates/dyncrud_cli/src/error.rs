//! CLI errors and their structured report.

use dyncrud_core::{CoreError, ErrorStatus};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Engine error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An argument is not valid JSON of the expected shape.
    #[error("invalid {what}: {message}")]
    BadInput {
        /// Which argument was rejected.
        what: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// A file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// Output could not be written.
    #[error("cannot write output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// Creates a `BadInput` error.
    pub fn bad_input(what: &'static str, message: impl Into<String>) -> Self {
        Self::BadInput {
            what,
            message: message.into(),
        }
    }

    /// Maps the error to a status.
    pub fn status(&self) -> ErrorStatus {
        match self {
            CliError::Core(err) => err.status(),
            CliError::BadInput { .. } => ErrorStatus::BadRequest,
            CliError::Io { .. } | CliError::Output(_) => ErrorStatus::Internal,
        }
    }
}

/// The JSON body printed for a failed command.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    /// Stable status name, e.g. `not_found`.
    pub status: &'static str,
    /// Human-readable message.
    pub error: String,
    /// Structured fields of the root error.
    pub detail: JsonValue,
}

impl ErrorReport {
    pub fn new(err: &CliError) -> Self {
        let detail = match err {
            CliError::Core(core) => core_detail(core),
            CliError::BadInput { what, message } => json!({ "argument": what, "message": message }),
            CliError::Io { path, source } => {
                json!({ "path": path.display().to_string(), "message": source.to_string() })
            }
            CliError::Output(source) => json!({ "message": source.to_string() }),
        };
        Self {
            status: err.status().as_str(),
            error: err.to_string(),
            detail,
        }
    }
}

fn core_detail(err: &CoreError) -> JsonValue {
    match err {
        CoreError::UnknownType { name, known } => json!({ "name": name, "known": known }),
        CoreError::MissingFields { type_name, fields } => {
            json!({ "type": type_name, "fields": fields })
        }
        CoreError::Conversion {
            field,
            from,
            to,
            value,
        }
        | CoreError::FilterConversion {
            field,
            from,
            to,
            value,
        } => json!({ "field": field, "from": from, "to": to, "value": value }),
        CoreError::NotFound { type_name, id } => json!({ "type": type_name, "id": id }),
        CoreError::ReferenceViolation {
            type_name,
            field,
            id,
            references,
        } => json!({ "type": type_name, "field": field, "id": id, "references": references }),
        CoreError::InvalidPayload { id, message } => json!({ "id": id, "message": message }),
        CoreError::Aborted { source } => json!({ "aborted": true, "cause": core_detail(source) }),
        other => json!({ "message": other.to_string() }),
    }
}

/// Prints the error report to stdout as pretty JSON.
pub fn report(err: &CliError) {
    let report = ErrorReport::new(err);
    match serde_json::to_string_pretty(&report) {
        Ok(text) => println!("{text}"),
        Err(_) => eprintln!("{}: {err}", report.status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_reports_cause_status_and_detail() {
        let err = CliError::from(CoreError::aborted(CoreError::not_found("order", 3)));
        let report = ErrorReport::new(&err);
        assert_eq!(report.status, "not_found");
        assert_eq!(report.detail["cause"]["id"], json!(3));
        assert!(report.error.contains("order with id 3 not found"));
    }

    #[test]
    fn bad_input_is_a_client_error() {
        let err = CliError::bad_input("fields", "expected a JSON object");
        let report = ErrorReport::new(&err);
        assert_eq!(report.status, "bad_request");
        assert_eq!(report.detail["argument"], json!("fields"));
    }
}
