//! Required-field validation.

use crate::error::{CoreError, CoreResult};
use crate::fields::FieldMap;
use crate::registry::TypeRegistry;

/// Checks that a field map carries every required field of its type.
///
/// Presence is checked by name ignoring ASCII case. A present field passes
/// whatever its value, including `null`; conversion is the builder's job.
#[derive(Debug, Clone, Copy)]
pub struct FieldValidator<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> FieldValidator<'a> {
    /// Creates a validator over a registry.
    #[must_use]
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    /// Validates `fields` against the rules registered for `type_name`.
    ///
    /// Types without registered rules accept any field map.
    ///
    /// # Errors
    ///
    /// Returns `MissingFields` naming every absent field.
    pub fn validate(&self, type_name: &str, fields: &FieldMap) -> CoreResult<()> {
        match self.registry.required_fields(type_name) {
            Some(required) => check_required(type_name, &required, fields),
            None => Ok(()),
        }
    }
}

/// Lists the required fields absent from `fields`, in the given order.
#[must_use]
pub fn missing_fields<S: AsRef<str>>(required: &[S], fields: &FieldMap) -> Vec<String> {
    required
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !fields.contains_key_ignore_case(name))
        .map(str::to_string)
        .collect()
}

pub(crate) fn check_required<S: AsRef<str>>(
    type_name: &str,
    required: &[S],
    fields: &FieldMap,
) -> CoreResult<()> {
    let missing = missing_fields(required, fields);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::MissingFields {
            type_name: type_name.to_string(),
            fields: missing,
        })
    }
}
