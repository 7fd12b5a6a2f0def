//! Create command implementation.

use super::{parse_fields, print_json, Context};
use crate::error::CliError;
use tracing::info;

/// Runs the create command.
pub fn run(ctx: &Context, type_name: &str, fields: &str) -> Result<(), CliError> {
    let entity = ctx.engine.create(type_name, parse_fields(fields)?)?;
    info!(type_name = entity.type_name(), id = entity.id(), "created");
    print_json(&entity)
}
