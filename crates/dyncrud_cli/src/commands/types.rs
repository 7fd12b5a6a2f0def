//! Types command implementation.

use super::{print_json, Context};
use crate::error::CliError;
use dyncrud_core::TypeDescriptor;
use serde::Serialize;

/// One registered type.
#[derive(Debug, Serialize)]
pub struct TypeInfo {
    pub name: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<&'static str>,
    pub required: Vec<String>,
}

impl From<&TypeDescriptor> for TypeInfo {
    fn from(descriptor: &TypeDescriptor) -> Self {
        let typed = descriptor.as_typed();
        Self {
            name: descriptor.name().to_string(),
            kind: if typed.is_some() { "typed" } else { "document" },
            table: typed.map(|d| d.table),
            primary_key: typed.map(|d| d.primary_key),
            required: descriptor
                .required_fields()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Runs the types command.
pub fn run(ctx: &Context) -> Result<(), CliError> {
    let types: Vec<TypeInfo> = ctx.engine.registry().iter().map(TypeInfo::from).collect();
    print_json(&types)
}
