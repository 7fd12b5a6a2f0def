//! Get command implementation.

use super::{print_json, Context};
use crate::error::CliError;

/// Runs the get command.
pub fn run(ctx: &Context, type_name: &str, id: i64) -> Result<(), CliError> {
    print_json(&ctx.engine.get_by_id(type_name, id)?)
}
