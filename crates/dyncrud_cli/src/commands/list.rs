//! List command implementation.

use super::{parse_filter, print_json, Context};
use crate::error::CliError;

/// Runs the list command.
pub fn run(ctx: &Context, type_name: &str, filters: &[String]) -> Result<(), CliError> {
    let filters = filters
        .iter()
        .map(|f| parse_filter(f))
        .collect::<Result<Vec<_>, _>>()?;
    print_json(&ctx.engine.list(type_name, filters)?)
}
