//! Delete command implementation.

use super::{print_json, Context};
use crate::error::CliError;
use serde_json::json;

/// Runs the delete command, printing how many objects were removed.
pub fn run(ctx: &Context, type_name: &str, id: i64) -> Result<(), CliError> {
    let removed = ctx.engine.delete(type_name, id)?;
    print_json(&json!({ "removed": removed }))
}
