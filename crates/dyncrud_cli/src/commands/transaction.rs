//! Transaction command implementation.

use super::{print_json, Context};
use crate::error::CliError;
use dyncrud_core::TransactionRequest;
use std::io::Read;
use std::path::Path;

fn read_request(file: &Path) -> Result<String, CliError> {
    let io_error = |source: std::io::Error| CliError::Io {
        path: file.to_path_buf(),
        source,
    };
    if file == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).map_err(io_error)?;
        Ok(text)
    } else {
        std::fs::read_to_string(file).map_err(io_error)
    }
}

/// Parses a transaction request.
pub fn parse_request(text: &str) -> Result<TransactionRequest, CliError> {
    serde_json::from_str(text).map_err(|e| CliError::bad_input("transaction request", e.to_string()))
}

/// Runs the transaction command.
pub fn run(ctx: &Context, file: &Path) -> Result<(), CliError> {
    let request = parse_request(&read_request(file)?)?;
    print_json(&ctx.engine.execute(request)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn request_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "masterObjectType": "invoice",
                "masterFields": {{ "InvoiceId": 1 }},
                "subObjects": [{{ "objectType": "line", "fields": {{ "ParentId": 1 }} }}]
            }}"#
        )
        .unwrap();

        let request = parse_request(&read_request(file.path()).unwrap()).unwrap();
        assert_eq!(request.master_object_type, "invoice");
        assert_eq!(request.sub_objects.len(), 1);

        let ctx = Context::open(None, false).unwrap();
        let created = ctx.engine.execute(request).unwrap();
        assert_eq!(created.len(), 2);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_request(Path::new("/nonexistent/request.json")).unwrap_err();
        assert!(matches!(err, CliError::Io { .. }));
    }
}
