//! Typed store: the fixed-schema persistence path.

use crate::builder::{apply_fields, build_record};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::fields::FieldMap;
use crate::link::LinkResolver;
use crate::predicate::PredicateBuilder;
use crate::registry::TypeRegistry;
use crate::request::SubObject;
use crate::schema::{EntityDescriptor, OnDelete, ParentKey, Record};
use crate::session::Session;
use crate::validate::check_required;
use crate::value::Value;
use dyncrud_storage::RowKey;
use tracing::debug;

/// A master record and its dependents, validated and ready to insert.
///
/// Produced by [`TypedStore::prepare_with_dependents`]; every check that
/// can run without storage has passed.
#[derive(Debug, Clone)]
pub struct PreparedGraph {
    master: Record,
    children: Vec<(&'static EntityDescriptor, FieldMap)>,
}

impl PreparedGraph {
    /// Returns the unsaved master record.
    #[must_use]
    pub fn master(&self) -> &Record {
        &self.master
    }

    /// Returns the number of dependents.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Reads and writes typed records through a session.
#[derive(Debug, Clone, Copy)]
pub struct TypedStore<'a> {
    registry: &'a TypeRegistry,
    config: &'a Config,
    resolver: LinkResolver,
}

impl<'a> TypedStore<'a> {
    /// Creates a typed store.
    #[must_use]
    pub fn new(registry: &'a TypeRegistry, config: &'a Config) -> Self {
        Self {
            registry,
            config,
            resolver: LinkResolver::new(config.link_strategy),
        }
    }

    /// Validates and builds a record without storing it.
    fn prepare(
        &self,
        descriptor: &'static EntityDescriptor,
        fields: &FieldMap,
    ) -> CoreResult<Record> {
        check_required(descriptor.name, descriptor.required, fields)?;
        build_record(descriptor, fields)
    }

    /// Stores a new record; storage assigns its primary key.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType`, `MissingFields` or `Conversion` before
    /// writing, or `ReferenceViolation` if a foreign key names a missing
    /// row.
    pub fn create(
        &self,
        session: &mut Session<'_>,
        type_name: &str,
        fields: &FieldMap,
    ) -> CoreResult<Record> {
        let descriptor = self.registry.resolve_typed(type_name)?;
        let record = self.prepare(descriptor, fields)?;
        self.insert(session, record)
    }

    fn insert(&self, session: &mut Session<'_>, mut record: Record) -> CoreResult<Record> {
        self.check_references(session, &record)?;
        let descriptor = record.descriptor();
        let key = session.insert(descriptor.table, record.encode()?)?;
        record.set_id(key.as_i64());
        debug!(type_name = descriptor.name, id = key.as_i64(), "record created");
        Ok(record)
    }

    /// Loads a record by id.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType` or `NotFound`.
    pub fn get_by_id(&self, session: &Session<'_>, type_name: &str, id: i64) -> CoreResult<Record> {
        let descriptor = self.registry.resolve_typed(type_name)?;
        self.load(session, descriptor, id)
    }

    fn load(
        &self,
        session: &Session<'_>,
        descriptor: &'static EntityDescriptor,
        id: i64,
    ) -> CoreResult<Record> {
        let bytes = session
            .get(descriptor.table, RowKey::new(id))?
            .ok_or_else(|| CoreError::not_found(descriptor.name, id))?;
        descriptor.decode(id, &bytes)
    }

    fn scan(
        &self,
        session: &Session<'_>,
        descriptor: &'static EntityDescriptor,
    ) -> CoreResult<Vec<Record>> {
        session
            .scan(descriptor.table)?
            .into_iter()
            .map(|(key, bytes)| descriptor.decode(key.as_i64(), &bytes))
            .collect()
    }

    /// Lists records matching every filter, in id order.
    ///
    /// Filter keys that name no field of the type are ignored.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType`, or `FilterConversion` if a filter value
    /// cannot be coerced to its field's type.
    pub fn list<I, K, V>(
        &self,
        session: &Session<'_>,
        type_name: &str,
        filters: I,
    ) -> CoreResult<Vec<Record>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let descriptor = self.registry.resolve_typed(type_name)?;
        let predicate = PredicateBuilder::new(descriptor).build(filters)?;
        let mut records = self.scan(session, descriptor)?;
        records.retain(|record| predicate.matches(record));
        Ok(records)
    }

    /// Applies a partial update to a stored record.
    ///
    /// The primary key never changes. Nothing is written unless every
    /// supplied value converts.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Conversion`, or `ReferenceViolation` if an
    /// updated foreign key names a missing row.
    pub fn update(
        &self,
        session: &mut Session<'_>,
        type_name: &str,
        id: i64,
        fields: &FieldMap,
    ) -> CoreResult<Record> {
        let descriptor = self.registry.resolve_typed(type_name)?;
        let mut record = self.load(session, descriptor, id)?;
        apply_fields(&mut record, fields)?;
        self.check_references(session, &record)?;
        session.update(descriptor.table, RowKey::new(id), record.encode()?)?;
        debug!(type_name = descriptor.name, id, "record updated");
        Ok(record)
    }

    /// Deletes a record, honoring the delete rules of records that
    /// reference it.
    ///
    /// Cascading dependents are deleted first, recursively. Returns the
    /// number of records removed, the target included.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or `ReferenceViolation` if a restricting
    /// dependent exists anywhere in the cascade. Writes made before the
    /// error stay pending in the session; the caller must not commit it.
    pub fn delete(&self, session: &mut Session<'_>, type_name: &str, id: i64) -> CoreResult<usize> {
        let descriptor = self.registry.resolve_typed(type_name)?;
        self.load(session, descriptor, id)?;
        self.delete_cascading(session, descriptor, id)
    }

    fn delete_cascading(
        &self,
        session: &mut Session<'_>,
        descriptor: &'static EntityDescriptor,
        id: i64,
    ) -> CoreResult<usize> {
        let mut removed = 0;
        if self.config.enforce_foreign_keys {
            for dependent_type in self.registry.typed() {
                for fk in dependent_type
                    .foreign_keys
                    .iter()
                    .filter(|fk| fk.references == descriptor.name)
                {
                    let dependents: Vec<i64> = self
                        .scan(session, dependent_type)?
                        .iter()
                        .filter(|r| r.get(fk.field) == Some(Value::Integer(id)))
                        .filter_map(Record::id)
                        .collect();
                    if dependents.is_empty() {
                        continue;
                    }
                    match fk.on_delete {
                        OnDelete::Restrict => {
                            return Err(CoreError::ReferenceViolation {
                                type_name: dependent_type.name.to_string(),
                                field: fk.field.to_string(),
                                id,
                                references: format!(
                                    "{} {} still referenced by {} {}",
                                    descriptor.name,
                                    id,
                                    dependents.len(),
                                    dependent_type.name
                                ),
                            });
                        }
                        OnDelete::Cascade => {
                            for dependent in dependents {
                                removed += self.delete_cascading(session, dependent_type, dependent)?;
                            }
                        }
                    }
                }
            }
        }

        session.remove(descriptor.table, RowKey::new(id))?;
        debug!(type_name = descriptor.name, id, cascaded = removed, "record deleted");
        Ok(removed + 1)
    }

    fn check_references(&self, session: &Session<'_>, record: &Record) -> CoreResult<()> {
        if !self.config.enforce_foreign_keys {
            return Ok(());
        }
        let descriptor = record.descriptor();
        for fk in descriptor.foreign_keys {
            let Some(target) = self.registry.get(fk.references).and_then(|t| t.as_typed()) else {
                continue;
            };
            let id = record
                .get(fk.field)
                .and_then(|v| v.as_integer())
                .unwrap_or_default();
            if session.get(target.table, RowKey::new(id))?.is_none() {
                return Err(CoreError::ReferenceViolation {
                    type_name: descriptor.name.to_string(),
                    field: fk.field.to_string(),
                    id,
                    references: format!("no {} with id {}", target.name, id),
                });
            }
        }
        Ok(())
    }

    /// Validates a master and its dependents without touching storage.
    ///
    /// Each dependent is linked to a placeholder key of the master first,
    /// so a foreign key the link supplies counts as present.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType`, `MissingFields` or `Conversion` for the first
    /// failing object.
    pub fn prepare_with_dependents(
        &self,
        master_type: &str,
        master_fields: &FieldMap,
        sub_objects: &[SubObject],
    ) -> CoreResult<PreparedGraph> {
        let master_descriptor = self.registry.resolve_typed(master_type)?;
        let master = self.prepare(master_descriptor, master_fields)?;
        let placeholder = ParentKey {
            type_name: master_descriptor.name,
            display_name: master_descriptor.display_name,
            field: master_descriptor.primary_key,
            value: 0,
        };

        let mut children = Vec::with_capacity(sub_objects.len());
        for sub in sub_objects {
            let descriptor = self.registry.resolve_typed(&sub.object_type)?;
            let linked = self
                .resolver
                .link_to_key(&placeholder, Some(descriptor), sub.fields.clone());
            self.prepare(descriptor, &linked)?;
            children.push((descriptor, sub.fields.clone()));
        }

        Ok(PreparedGraph { master, children })
    }

    /// Inserts a prepared master, then each dependent linked to it.
    ///
    /// # Errors
    ///
    /// Returns the first storage or reference failure. Writes made before
    /// the error stay pending in the session; the caller must not commit
    /// it.
    pub fn insert_prepared(
        &self,
        session: &mut Session<'_>,
        graph: PreparedGraph,
    ) -> CoreResult<(Record, Vec<Record>)> {
        let master = self.insert(session, graph.master)?;
        let mut children = Vec::with_capacity(graph.children.len());
        for (descriptor, fields) in graph.children {
            let linked = self.resolver.link_child(&master, Some(descriptor), fields);
            let child = build_record(descriptor, &linked)?;
            children.push(self.insert(session, child)?);
        }
        debug!(
            type_name = master.type_name(),
            children = children.len(),
            "record graph created"
        );
        Ok((master, children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use dyncrud_storage::{InMemoryEngine, StorageEngine};

    struct Fixture {
        engine: InMemoryEngine,
        registry: TypeRegistry,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                engine: InMemoryEngine::new(),
                registry: TypeRegistry::builtin(),
                config: Config::default(),
            }
        }

        fn store(&self) -> TypedStore<'_> {
            TypedStore::new(&self.registry, &self.config)
        }

        fn committed<T>(&self, f: impl FnOnce(&mut Session<'_>) -> CoreResult<T>) -> CoreResult<T> {
            let engine: &dyn StorageEngine = &self.engine;
            let mut session = Session::begin(engine)?;
            let result = f(&mut session)?;
            session.commit()?;
            Ok(result)
        }
    }

    fn customer() -> FieldMap {
        fields! {
            "FirstName" => "Ada",
            "LastName" => "Lovelace",
            "Email" => "ada@example.com",
            "Phone" => "555",
            "Address" => "London",
        }
    }

    fn product(price: &str) -> FieldMap {
        fields! { "ProductName" => "Lamp", "ProductDescription" => "Desk lamp", "Price" => price }
    }

    #[test]
    fn create_assigns_key_and_ignores_supplied_one() {
        let fx = Fixture::new();
        let mut input = product("19.99");
        input.insert("ProductId", 500);
        let record = fx.committed(|s| fx.store().create(s, "product", &input)).unwrap();
        assert_eq!(record.id(), Some(1));
    }

    #[test]
    fn foreign_key_must_exist() {
        let fx = Fixture::new();
        let order = fields! {
            "CustomerId" => 42, "OrderDate" => "2024-01-01", "TotalAmount" => 10, "Status" => "new"
        };
        let result = fx.committed(|s| fx.store().create(s, "order", &order));
        assert!(matches!(result, Err(CoreError::ReferenceViolation { id: 42, .. })));
    }

    #[test]
    fn foreign_keys_can_be_disabled() {
        let mut fx = Fixture::new();
        fx.config = Config::new().enforce_foreign_keys(false);
        let order = fields! {
            "CustomerId" => 42, "OrderDate" => "2024-01-01", "TotalAmount" => 10, "Status" => "new"
        };
        assert!(fx.committed(|s| fx.store().create(s, "order", &order)).is_ok());
    }

    #[test]
    fn update_is_partial_and_all_or_nothing() {
        let fx = Fixture::new();
        let created = fx.committed(|s| fx.store().create(s, "product", &product("5"))).unwrap();
        let id = created.id().unwrap();

        let bad = fx.committed(|s| {
            fx.store().update(s, "product", id, &fields! { "ProductName" => "Bulb", "Price" => "x" })
        });
        assert!(matches!(bad, Err(CoreError::Conversion { .. })));

        let updated = fx
            .committed(|s| fx.store().update(s, "product", id, &fields! { "Price" => "6.50" }))
            .unwrap();
        assert_eq!(updated.get("ProductName"), Some(Value::from("Lamp")));
        assert_eq!(updated.get("Price"), Some(Value::Decimal("6.50".parse().unwrap())));
    }

    #[test]
    fn restrict_blocks_delete_and_cascade_removes_lines() {
        let fx = Fixture::new();
        let (customer_id, order_id, product_id) = fx
            .committed(|s| {
                let store = fx.store();
                let customer = store.create(s, "customer", &customer())?;
                let product = store.create(s, "product", &product("2"))?;
                let graph = store.prepare_with_dependents(
                    "order",
                    &fields! {
                        "CustomerId" => (customer.id()),
                        "OrderDate" => "2024-01-01",
                        "TotalAmount" => 4,
                        "Status" => "new",
                    },
                    &[SubObject::new(
                        "orderproduct",
                        fields! { "ProductId" => (product.id()), "Quantity" => 2, "Price" => 2 },
                    )],
                )?;
                let (order, lines) = store.insert_prepared(s, graph)?;
                assert_eq!(lines[0].get("OrderId").and_then(|v| v.as_integer()), order.id());
                Ok((customer.id().unwrap(), order.id().unwrap(), product.id().unwrap()))
            })
            .unwrap();

        let blocked = fx.committed(|s| fx.store().delete(s, "customer", customer_id));
        assert!(matches!(blocked, Err(CoreError::ReferenceViolation { .. })));
        let blocked = fx.committed(|s| fx.store().delete(s, "product", product_id));
        assert!(matches!(blocked, Err(CoreError::ReferenceViolation { .. })));

        let removed = fx.committed(|s| fx.store().delete(s, "order", order_id)).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(fx.engine.row_count("order_products"), 0);
        assert!(fx.committed(|s| fx.store().delete(s, "customer", customer_id)).is_ok());
    }

    #[test]
    fn prepare_rejects_invalid_dependents_before_writing() {
        let fx = Fixture::new();
        let result = fx.store().prepare_with_dependents(
            "product",
            &product("1"),
            &[SubObject::new("customer", fields! { "FirstName" => "x" })],
        );
        assert!(matches!(result, Err(CoreError::MissingFields { .. })));
    }

    #[test]
    fn list_filters_by_coerced_value() {
        let fx = Fixture::new();
        fx.committed(|s| {
            fx.store().create(s, "product", &product("19.99"))?;
            fx.store().create(s, "product", &product("5"))
        })
        .unwrap();

        let session = Session::begin(&fx.engine).unwrap();
        let cheap = fx.store().list(&session, "product", [("price", "5.00")]).unwrap();
        assert_eq!(cheap.len(), 1);
        let all = fx.store().list(&session, "product", Vec::<(String, String)>::new()).unwrap();
        assert_eq!(all.len(), 2);
    }
}
