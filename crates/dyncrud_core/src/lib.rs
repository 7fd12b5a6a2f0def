//! # dyncrud core
//!
//! Dynamic entity persistence engine.
//!
//! Callers name an entity type at runtime and hand over a loosely-typed
//! [`FieldMap`]. The engine then either:
//! - builds a typed [`Record`] for a registered entity (coercing values to
//!   declared field types and checking foreign keys), or
//! - stores the map as an opaque [`Document`] tagged with its type name.
//!
//! This crate provides:
//! - Type registry and required-field validation
//! - Record building and parent-link resolution for sub-objects
//! - Equality predicates over typed fields
//! - The schema-less document store
//! - Sessions and all-or-nothing transactions over a
//!   [`dyncrud_storage::StorageEngine`]
//! - The [`Engine`] facade routing each call to the right path
//!
//! ## Example
//!
//! ```rust
//! use dyncrud_core::{fields, Engine, SubObject};
//!
//! let engine = Engine::in_memory();
//! let created = engine
//!     .create_with_dependents(
//!         "invoice",
//!         fields! { "InvoiceId" => 7, "Total" => 12.5 },
//!         vec![SubObject::new("line", fields! { "ParentId" => 7, "Qty" => 1 })],
//!     )
//!     .unwrap();
//! assert_eq!(created.len(), 2);
//!
//! // Deleting the master removes the line that points at it
//! engine.delete("invoice", created[0].id().unwrap()).unwrap();
//! assert!(engine.list_all("line").unwrap().is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod coordinator;
mod document;
mod engine;
mod error;
mod fields;
mod link;
mod predicate;
mod registry;
mod request;
mod schema;
mod session;
mod typed;
mod validate;
mod value;

pub use builder::{apply_fields, build_record, RecordBuilder};
pub use config::{CascadeMode, Config, LinkStrategy};
pub use coordinator::{TransactionCoordinator, WriteOp};
pub use document::{loosely_equals, own_key, scalar_text, Document, DocumentStore, PARENT_ID};
pub use engine::{Engine, Entity, Route};
pub use error::{CoreError, CoreResult, ErrorStatus};
pub use fields::FieldMap;
pub use link::{link_by_convention, LinkResolver};
pub use predicate::{Clause, Predicate, PredicateBuilder};
pub use registry::{canonical_name, DocumentSchema, TypeDescriptor, TypeRegistry};
pub use request::{SubObject, TransactionRequest, SUB_OBJECTS};
pub use schema::{
    Customer, EntityDescriptor, FieldDef, ForeignKey, OnDelete, Order, OrderProduct, ParentKey,
    Product, Record, BUILTIN,
};
pub use session::Session;
pub use typed::{PreparedGraph, TypedStore};
pub use validate::{missing_fields, FieldValidator};
pub use value::{coerce_json, coerce_str, json_type_name, FieldType, FromValue, Value};

// Re-export storage types callers need to wire an engine
pub use dyncrud_storage::{FileEngine, InMemoryEngine, StorageEngine, StorageError};
