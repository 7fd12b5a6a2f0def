//! Builds typed records from loosely-typed field maps.

use crate::error::{CoreError, CoreResult};
use crate::fields::FieldMap;
use crate::registry::TypeRegistry;
use crate::schema::{EntityDescriptor, Record};
use crate::value::{coerce_json, json_type_name, Value};
use tracing::trace;

/// Turns field maps into typed records.
///
/// Keys are matched to schema fields ignoring ASCII case; keys that match no
/// schema field are skipped. Every value is coerced before the record is
/// touched, so a failed build or apply leaves nothing half-written.
#[derive(Debug, Clone, Copy)]
pub struct RecordBuilder<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> RecordBuilder<'a> {
    /// Creates a builder over a registry.
    #[must_use]
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    /// Builds a new record of the named type.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType` if the name is not a typed entity, or
    /// `Conversion` for the first value that cannot be coerced.
    pub fn build(&self, type_name: &str, fields: &FieldMap) -> CoreResult<Record> {
        let descriptor = self.registry.resolve_typed(type_name)?;
        build_record(descriptor, fields)
    }
}

/// Builds a new record of the described type.
///
/// A primary-key value in `fields` is accepted here; storage overrides it
/// when the record is inserted.
///
/// # Errors
///
/// Returns `Conversion` for the first value that cannot be coerced.
pub fn build_record(descriptor: &'static EntityDescriptor, fields: &FieldMap) -> CoreResult<Record> {
    let mut record = descriptor.new_record();
    for (name, value) in coerce_all(descriptor, fields, false)? {
        record.set(name, value);
    }
    Ok(record)
}

/// Applies a partial update to a record.
///
/// The primary key is never changed.
///
/// # Errors
///
/// Returns `Conversion` for the first value that cannot be coerced; the
/// record is unchanged in that case.
pub fn apply_fields(record: &mut Record, fields: &FieldMap) -> CoreResult<()> {
    for (name, value) in coerce_all(record.descriptor(), fields, true)? {
        record.set(name, value);
    }
    Ok(())
}

fn coerce_all(
    descriptor: &'static EntityDescriptor,
    fields: &FieldMap,
    skip_primary_key: bool,
) -> CoreResult<Vec<(&'static str, Value)>> {
    let mut coerced = Vec::with_capacity(fields.len());
    for (key, raw) in fields.iter() {
        let Some(def) = descriptor.field(key) else {
            trace!(type_name = descriptor.name, field = key, "skipping unknown field");
            continue;
        };
        if skip_primary_key && def.name == descriptor.primary_key {
            continue;
        }
        let value = coerce_json(raw, def.ty).ok_or_else(|| CoreError::Conversion {
            field: def.name.to_string(),
            from: json_type_name(raw).to_string(),
            to: def.ty.name().to_string(),
            value: raw.to_string(),
        })?;
        coerced.push((def.name, value));
    }
    Ok(coerced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use crate::schema::Product;
    use rust_decimal::Decimal;

    #[test]
    fn build_coerces_and_matches_case_insensitively() {
        let registry = TypeRegistry::builtin();
        let record = RecordBuilder::new(&registry)
            .build(
                "product",
                &fields! {
                    "productname" => "Lamp",
                    "ProductDescription" => "Desk lamp",
                    "PRICE" => "19.99",
                    "Unrelated" => [1, 2],
                },
            )
            .unwrap();

        match record {
            Record::Product(Product {
                product_name,
                price,
                ..
            }) => {
                assert_eq!(product_name, "Lamp");
                assert_eq!(price, Decimal::new(1999, 2));
            }
            other => panic!("expected product, got {other:?}"),
        }
    }

    #[test]
    fn conversion_error_names_field_and_types() {
        let registry = TypeRegistry::builtin();
        let result = RecordBuilder::new(&registry).build(
            "order",
            &fields! { "CustomerId" => "abc", "Status" => "new" },
        );

        match result {
            Err(CoreError::Conversion {
                field, from, to, value,
            }) => {
                assert_eq!(field, "CustomerId");
                assert_eq!(from, "string");
                assert_eq!(to, "integer");
                assert_eq!(value, "\"abc\"");
            }
            other => panic!("expected Conversion, got {other:?}"),
        }
    }

    #[test]
    fn build_unknown_type_fails() {
        let registry = TypeRegistry::builtin();
        let result = RecordBuilder::new(&registry).build("widget", &FieldMap::new());
        assert!(matches!(result, Err(CoreError::UnknownType { .. })));
    }

    #[test]
    fn apply_skips_primary_key_and_is_all_or_nothing() {
        let registry = TypeRegistry::builtin();
        let mut record = RecordBuilder::new(&registry)
            .build("product", &fields! { "ProductName" => "Lamp", "Price" => 5 })
            .unwrap();
        record.set_id(3);
        let before = record.clone();

        let bad = fields! { "ProductName" => "Bulb", "Price" => "cheap" };
        assert!(apply_fields(&mut record, &bad).is_err());
        assert_eq!(record, before);

        apply_fields(&mut record, &fields! { "ProductId" => 99, "Price" => 6 }).unwrap();
        assert_eq!(record.id(), Some(3));
        assert_eq!(record.get("Price"), Some(Value::Decimal(Decimal::new(6, 0))));
    }
}
