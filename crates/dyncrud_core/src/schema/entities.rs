//! The built-in typed entities.

use super::{decode_cbor, EntityDescriptor, FieldDef, ForeignKey, OnDelete, Record};
use crate::value::{FieldType, FromValue, Value};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Declares a typed entity: the struct, its descriptor and field access.
///
/// The first field is the primary key.
macro_rules! entity {
    (
        $(#[$meta:meta])*
        $ty:ident in $table:literal as $name:literal, descriptor $desc:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident: $fty:ty = $wire:literal as $kind:ident
            ),+ $(,)?
        }
        required [$($req:literal),* $(,)?]
        references [$($fk_field:literal => $fk_target:literal on delete $on_delete:ident),* $(,)?]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $ty {
            $(
                $(#[$fmeta])*
                #[doc = concat!("The `", $wire, "` field.")]
                #[serde(rename = $wire)]
                pub $field: $fty,
            )+
        }

        pub(crate) static $desc: EntityDescriptor = EntityDescriptor {
            name: $name,
            display_name: stringify!($ty),
            table: $table,
            primary_key: entity!(@first $($wire),+),
            fields: &[$(FieldDef { name: $wire, ty: FieldType::$kind }),+],
            required: &[$($req),*],
            foreign_keys: &[$(ForeignKey {
                field: $fk_field,
                references: $fk_target,
                on_delete: OnDelete::$on_delete,
            }),*],
            construct: || Record::$ty($ty::default()),
            decode: |bytes| decode_cbor::<$ty>(bytes).map(Record::$ty),
        };

        impl $ty {
            /// Returns the static descriptor of this entity.
            #[must_use]
            pub fn descriptor() -> &'static EntityDescriptor {
                &$desc
            }

            /// Reads a field by canonical name.
            #[must_use]
            pub fn get(&self, field: &str) -> Option<Value> {
                match field {
                    $($wire => Some(Value::from(self.$field.clone())),)+
                    _ => None,
                }
            }

            /// Writes a field by canonical name.
            ///
            /// Returns false if the field is unknown or the value has the
            /// wrong type; the entity is unchanged in that case.
            pub fn set(&mut self, field: &str, value: Value) -> bool {
                match field {
                    $($wire => match <$fty as FromValue>::from_value(value) {
                        Some(v) => {
                            self.$field = v;
                            true
                        }
                        None => false,
                    },)+
                    _ => false,
                }
            }
        }
    };
    (@first $head:literal $(, $rest:literal)*) => { $head };
}

entity! {
    /// A customer.
    Customer in "customers" as "customer", descriptor CUSTOMER {
        customer_id: i64 = "CustomerId" as Integer,
        first_name: String = "FirstName" as Text,
        last_name: String = "LastName" as Text,
        email: String = "Email" as Text,
        phone: String = "Phone" as Text,
        address: String = "Address" as Text,
    }
    required ["FirstName", "LastName", "Email", "Phone", "Address"]
    references []
}

entity! {
    /// An order placed by a customer.
    Order in "orders" as "order", descriptor ORDER {
        order_id: i64 = "OrderId" as Integer,
        customer_id: i64 = "CustomerId" as Integer,
        order_date: DateTime<Utc> = "OrderDate" as DateTime,
        total_amount: Decimal = "TotalAmount" as Decimal,
        status: String = "Status" as Text,
    }
    required ["CustomerId", "OrderDate", "TotalAmount", "Status"]
    references ["CustomerId" => "customer" on delete Restrict]
}

entity! {
    /// A product that can be ordered.
    Product in "products" as "product", descriptor PRODUCT {
        product_id: i64 = "ProductId" as Integer,
        product_name: String = "ProductName" as Text,
        product_description: String = "ProductDescription" as Text,
        price: Decimal = "Price" as Decimal,
    }
    required ["ProductName", "ProductDescription", "Price"]
    references []
}

entity! {
    /// A line of an order: a product, a quantity and the price paid.
    OrderProduct in "order_products" as "orderproduct", descriptor ORDER_PRODUCT {
        order_product_id: i64 = "OrderProductId" as Integer,
        /// Set by linking when created as a sub-object of an order.
        order_id: i64 = "OrderId" as Integer,
        product_id: i64 = "ProductId" as Integer,
        quantity: i64 = "Quantity" as Integer,
        price: Decimal = "Price" as Decimal,
    }
    required ["ProductId", "Quantity", "Price"]
    references [
        "OrderId" => "order" on delete Cascade,
        "ProductId" => "product" on delete Restrict,
    ]
}
