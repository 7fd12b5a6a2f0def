//! A typed entity instance of any built-in type.

use super::entities::{Customer, Order, OrderProduct, Product};
use super::{encode_cbor, EntityDescriptor};
use crate::error::CoreResult;
use crate::fields::FieldMap;
use crate::value::Value;
use serde::Serialize;

/// One typed entity instance.
///
/// Serializes as the bare entity, e.g. `{"ProductId": 1, ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Record {
    /// A customer.
    Customer(Customer),
    /// An order.
    Order(Order),
    /// A product.
    Product(Product),
    /// An order line.
    OrderProduct(OrderProduct),
}

macro_rules! each_record {
    ($record:expr, $inner:ident => $body:expr) => {
        match $record {
            Record::Customer($inner) => $body,
            Record::Order($inner) => $body,
            Record::Product($inner) => $body,
            Record::OrderProduct($inner) => $body,
        }
    };
}

/// The key a parent record offers to its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentKey {
    /// Canonical parent type name, e.g. `order`.
    pub type_name: &'static str,
    /// Display name of the parent type, e.g. `Order`.
    pub display_name: &'static str,
    /// Name of the parent's key field, e.g. `OrderId`.
    pub field: &'static str,
    /// The key value.
    pub value: i64,
}

impl Record {
    /// Returns the descriptor of this record's type.
    #[must_use]
    pub fn descriptor(&self) -> &'static EntityDescriptor {
        match self {
            Record::Customer(_) => Customer::descriptor(),
            Record::Order(_) => Order::descriptor(),
            Record::Product(_) => Product::descriptor(),
            Record::OrderProduct(_) => OrderProduct::descriptor(),
        }
    }

    /// Returns the canonical type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.descriptor().name
    }

    /// Reads a field by canonical name.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        each_record!(self, r => r.get(field))
    }

    /// Writes a field by canonical name.
    pub fn set(&mut self, field: &str, value: Value) -> bool {
        each_record!(self, r => r.set(field, value))
    }

    /// Returns the primary key, or `None` before storage assigned one.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.get(self.descriptor().primary_key)
            .and_then(|v| v.as_integer())
            .filter(|id| *id > 0)
    }

    pub(crate) fn set_id(&mut self, id: i64) {
        let primary_key = self.descriptor().primary_key;
        self.set(primary_key, Value::Integer(id));
    }

    /// Returns the key children use to point at this record.
    ///
    /// `None` until the record has been assigned an id.
    #[must_use]
    pub fn parent_key(&self) -> Option<ParentKey> {
        let descriptor = self.descriptor();
        self.id().map(|value| ParentKey {
            type_name: descriptor.name,
            display_name: descriptor.display_name,
            field: descriptor.primary_key,
            value,
        })
    }

    /// Renders every field, in declaration order.
    #[must_use]
    pub fn to_fields(&self) -> FieldMap {
        self.descriptor()
            .fields
            .iter()
            .filter_map(|f| self.get(f.name).map(|v| (f.name, v.to_json())))
            .collect()
    }

    /// Encodes the record as a storage row.
    ///
    /// # Errors
    ///
    /// Returns a codec error if encoding fails.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        each_record!(self, r => encode_cbor(r))
    }
}
