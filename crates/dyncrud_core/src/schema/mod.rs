//! Entity schema: field descriptors and the built-in typed entities.
//!
//! Each typed entity carries a static [`EntityDescriptor`] that lists its
//! table, primary key, fields with their declared types, required fields and
//! foreign keys. Generic code works through the descriptor and the
//! [`Record`] enum; no runtime reflection is involved.

mod entities;
mod record;

pub use entities::{Customer, Order, OrderProduct, Product};
pub use record::{ParentKey, Record};

use crate::error::{CoreError, CoreResult};
use crate::value::FieldType;

/// A declared field of a typed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Canonical field name.
    pub name: &'static str,
    /// Declared type.
    pub ty: FieldType,
}

/// What happens to dependents when a referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Refuse the delete while dependents exist.
    Restrict,
    /// Delete dependents along with the row.
    Cascade,
}

/// A declared reference from one typed entity to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    /// Field holding the referenced key.
    pub field: &'static str,
    /// Canonical name of the referenced type.
    pub references: &'static str,
    /// Delete behavior.
    pub on_delete: OnDelete,
}

/// Static description of a typed entity.
#[derive(Debug)]
pub struct EntityDescriptor {
    /// Canonical lowercase type name, e.g. `orderproduct`.
    pub name: &'static str,
    /// Display name, e.g. `OrderProduct`.
    pub display_name: &'static str,
    /// Storage table.
    pub table: &'static str,
    /// Primary-key field, assigned by storage.
    pub primary_key: &'static str,
    /// Every field, primary key first.
    pub fields: &'static [FieldDef],
    /// Fields that must be present on create.
    pub required: &'static [&'static str],
    /// Declared foreign keys.
    pub foreign_keys: &'static [ForeignKey],
    pub(crate) construct: fn() -> Record,
    pub(crate) decode: fn(&[u8]) -> CoreResult<Record>,
}

impl EntityDescriptor {
    /// Looks up a field by name, ignoring ASCII case.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Returns true if `name` is the primary key, ignoring ASCII case.
    #[must_use]
    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key.eq_ignore_ascii_case(name)
    }

    /// Returns the declared foreign key pointing at `parent_type`, if any.
    #[must_use]
    pub fn foreign_key_to(&self, parent_type: &str) -> Option<&'static ForeignKey> {
        self.foreign_keys
            .iter()
            .find(|fk| fk.references.eq_ignore_ascii_case(parent_type))
    }

    /// Creates an empty record of this type.
    #[must_use]
    pub fn new_record(&self) -> Record {
        (self.construct)()
    }

    /// Decodes a stored row, taking the primary key from the row key.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the bytes are not a row of this type.
    pub fn decode(&self, id: i64, bytes: &[u8]) -> CoreResult<Record> {
        let mut record = (self.decode)(bytes)?;
        record.set_id(id);
        Ok(record)
    }
}

impl PartialEq for EntityDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EntityDescriptor {}

/// Every built-in typed entity, in registration order.
pub static BUILTIN: [&EntityDescriptor; 4] = [
    &entities::CUSTOMER,
    &entities::ORDER,
    &entities::PRODUCT,
    &entities::ORDER_PRODUCT,
];

pub(crate) fn decode_cbor<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> CoreResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| CoreError::codec(e.to_string()))
}

pub(crate) fn encode_cbor<T: serde::Serialize>(value: &T) -> CoreResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes).map_err(|e| CoreError::codec(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_schema_shape() {
        let names: Vec<&str> = BUILTIN.iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["customer", "order", "product", "orderproduct"]);

        for descriptor in BUILTIN {
            assert_eq!(descriptor.fields[0].name, descriptor.primary_key);
            assert_eq!(descriptor.fields[0].ty, FieldType::Integer);
            for required in descriptor.required {
                assert!(descriptor.field(required).is_some(), "{required}");
            }
        }
    }

    #[test]
    fn foreign_keys_reference_builtin_types() {
        for descriptor in BUILTIN {
            for fk in descriptor.foreign_keys {
                assert!(BUILTIN.iter().any(|d| d.name == fk.references));
                assert_eq!(descriptor.field(fk.field).map(|f| f.ty), Some(FieldType::Integer));
            }
        }
    }

    #[test]
    fn field_lookup_ignores_case() {
        let order = &entities::ORDER;
        assert_eq!(order.field("totalamount").map(|f| f.name), Some("TotalAmount"));
        assert!(order.is_primary_key("ORDERID"));
        assert_eq!(order.foreign_key_to("Customer").map(|fk| fk.field), Some("CustomerId"));
        assert!(order.foreign_key_to("product").is_none());
    }
}
