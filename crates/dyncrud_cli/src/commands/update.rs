//! Update command implementation.

use super::{parse_fields, print_json, Context};
use crate::error::CliError;
use tracing::info;

/// Runs the update command.
pub fn run(ctx: &Context, type_name: &str, id: i64, fields: &str) -> Result<(), CliError> {
    let entity = ctx.engine.update(type_name, id, parse_fields(fields)?)?;
    info!(type_name, id, "updated");
    print_json(&entity)
}
