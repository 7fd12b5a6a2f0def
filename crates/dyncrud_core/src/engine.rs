//! The entity engine: one entry point for both persistence paths.

use crate::config::Config;
use crate::coordinator::TransactionCoordinator;
use crate::document::{Document, DocumentStore};
use crate::error::{CoreError, CoreResult};
use crate::fields::FieldMap;
use crate::registry::{canonical_name, TypeDescriptor, TypeRegistry};
use crate::request::{SubObject, TransactionRequest};
use crate::schema::{EntityDescriptor, Record};
use crate::session::Session;
use crate::typed::TypedStore;
use dyncrud_storage::{InMemoryEngine, StorageEngine};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// A stored object from either path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Entity {
    /// A typed record.
    Record(Record),
    /// A document.
    Document(Document),
}

impl Entity {
    /// Returns the storage-assigned id.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        match self {
            Entity::Record(record) => record.id(),
            Entity::Document(document) => Some(document.id),
        }
    }

    /// Returns the canonical type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Entity::Record(record) => record.type_name(),
            Entity::Document(document) => &document.object_type,
        }
    }

    /// Returns the record, if this is one.
    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Entity::Record(record) => Some(record),
            Entity::Document(_) => None,
        }
    }

    /// Returns the document, if this is one.
    #[must_use]
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Entity::Document(document) => Some(document),
            Entity::Record(_) => None,
        }
    }
}

impl From<Record> for Entity {
    fn from(record: Record) -> Self {
        Entity::Record(record)
    }
}

impl From<Document> for Entity {
    fn from(document: Document) -> Self {
        Entity::Document(document)
    }
}

/// Which path serves a type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The typed path, with the entity's descriptor.
    Typed(&'static EntityDescriptor),
    /// The document path.
    Document,
}

/// The dynamic entity engine.
///
/// Every operation takes a type name and routes it: typed entities go
/// through the [`TypedStore`], everything else through the
/// [`DocumentStore`]. With [`Config::documents_only`] every name takes the
/// document path. Each call runs in its own session and commits before
/// returning; a failed call leaves storage untouched.
///
/// # Example
///
/// ```rust
/// use dyncrud_core::{fields, Engine};
///
/// let engine = Engine::in_memory();
/// let product = engine
///     .create("product", fields! {
///         "ProductName" => "Lamp",
///         "ProductDescription" => "Desk lamp",
///         "Price" => "19.99",
///     })
///     .unwrap();
///
/// let id = product.id().unwrap();
/// assert_eq!(engine.get_by_id("Product", id).unwrap(), product);
/// ```
#[derive(Clone)]
pub struct Engine {
    storage: Arc<dyn StorageEngine>,
    registry: Arc<TypeRegistry>,
    config: Config,
}

impl Engine {
    /// Creates an engine with the built-in types and default configuration.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageEngine>) -> Self {
        Self::with_config(storage, TypeRegistry::builtin(), Config::default())
    }

    /// Creates an engine with an explicit registry and configuration.
    #[must_use]
    pub fn with_config(storage: Arc<dyn StorageEngine>, registry: TypeRegistry, config: Config) -> Self {
        Self {
            storage,
            registry: Arc::new(registry),
            config,
        }
    }

    /// Creates an engine over a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryEngine::new()))
    }

    /// Returns the type registry.
    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the storage engine.
    #[must_use]
    pub fn storage(&self) -> &dyn StorageEngine {
        self.storage.as_ref()
    }

    /// Returns the typed path.
    #[must_use]
    pub fn typed(&self) -> TypedStore<'_> {
        TypedStore::new(&self.registry, &self.config)
    }

    /// Returns the document path.
    #[must_use]
    pub fn documents(&self) -> DocumentStore<'_> {
        DocumentStore::new(&self.registry, &self.config)
    }

    /// Begins a session for callers composing their own requests.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot start a unit of work.
    pub fn session(&self) -> CoreResult<Session<'_>> {
        Session::begin(self.storage())
    }

    /// Returns a transaction coordinator on this engine's storage.
    #[must_use]
    pub fn coordinator(&self) -> TransactionCoordinator<'_> {
        TransactionCoordinator::new(self.storage())
    }

    /// Decides which path serves a type name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType` for an unregistered name when document types
    /// are strict.
    pub fn route(&self, type_name: &str) -> CoreResult<Route> {
        if self.config.documents_only {
            return self.documents_route(type_name);
        }
        match self.registry.get(type_name) {
            Some(TypeDescriptor::Typed(descriptor)) => Ok(Route::Typed(*descriptor)),
            Some(TypeDescriptor::Document(_)) => Ok(Route::Document),
            None => self.documents_route(type_name),
        }
    }

    fn documents_route(&self, type_name: &str) -> CoreResult<Route> {
        if self.config.strict_document_types {
            self.registry.resolve(type_name)?;
        }
        Ok(Route::Document)
    }

    /// Runs `f` in a session that commits only if `f` succeeds.
    fn in_session<T>(&self, f: impl FnOnce(&mut Session<'_>) -> CoreResult<T>) -> CoreResult<T> {
        let mut session = self.session()?;
        let result = f(&mut session)?;
        session.commit()?;
        Ok(result)
    }

    /// Creates an object.
    ///
    /// For a typed entity, a `SubObjects` array in `fields` creates
    /// dependents in the same transaction, as
    /// [`create_with_dependents`](Self::create_with_dependents) does; the
    /// master is returned.
    ///
    /// # Errors
    ///
    /// Returns `MissingFields`, `Conversion`, `UnknownType` or
    /// `ValidationMismatch` before writing, `ReferenceViolation` for a
    /// dangling typed foreign key, or `Aborted` if a dependent fails.
    pub fn create(&self, type_name: &str, mut fields: FieldMap) -> CoreResult<Entity> {
        match self.route(type_name)? {
            Route::Typed(descriptor) => {
                let subs = SubObject::take_embedded(&mut fields)?;
                if subs.is_empty() {
                    let record = self.in_session(|s| self.typed().create(s, descriptor.name, &fields))?;
                    Ok(record.into())
                } else {
                    self.create_with_dependents(descriptor.name, fields, subs)?
                        .into_iter()
                        .next()
                        .ok_or_else(|| CoreError::validation_mismatch("transaction created no master"))
                }
            }
            Route::Document => {
                let document = self.in_session(|s| self.documents().create(s, type_name, &fields))?;
                Ok(document.into())
            }
        }
    }

    /// Loads an object by id.
    ///
    /// A document whose type differs from `type_name` is not found.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing of this type has the id.
    pub fn get_by_id(&self, type_name: &str, id: i64) -> CoreResult<Entity> {
        let session = self.session()?;
        match self.route(type_name)? {
            Route::Typed(descriptor) => Ok(self.typed().get_by_id(&session, descriptor.name, id)?.into()),
            Route::Document => {
                let document = self.documents().get_by_id(&session, id)?;
                if document.object_type == canonical_name(type_name) {
                    Ok(document.into())
                } else {
                    Err(CoreError::not_found(canonical_name(type_name), id))
                }
            }
        }
    }

    /// Updates an object.
    ///
    /// Typed records take a partial update; documents have their payload
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Conversion`, `MissingFields` or
    /// `ReferenceViolation`; nothing is written on error.
    pub fn update(&self, type_name: &str, id: i64, fields: FieldMap) -> CoreResult<Entity> {
        match self.route(type_name)? {
            Route::Typed(descriptor) => {
                let record = self.in_session(|s| self.typed().update(s, descriptor.name, id, &fields))?;
                Ok(record.into())
            }
            Route::Document => {
                let document = self.in_session(|s| {
                    self.ensure_document_type(s, type_name, id)?;
                    self.documents().update(s, id, &fields)
                })?;
                Ok(document.into())
            }
        }
    }

    /// Deletes an object and its dependents.
    ///
    /// Returns the number of objects removed, the target included.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or `ReferenceViolation` when a restricting
    /// typed dependent exists; nothing is removed on error.
    pub fn delete(&self, type_name: &str, id: i64) -> CoreResult<usize> {
        let removed = match self.route(type_name)? {
            Route::Typed(descriptor) => self.in_session(|s| self.typed().delete(s, descriptor.name, id))?,
            Route::Document => self.in_session(|s| {
                self.ensure_document_type(s, type_name, id)?;
                self.documents().delete(s, id).map(|ids| ids.len())
            })?,
        };
        info!(type_name, id, removed, "deleted");
        Ok(removed)
    }

    fn ensure_document_type(&self, session: &Session<'_>, type_name: &str, id: i64) -> CoreResult<()> {
        let document = self.documents().get_by_id(session, id)?;
        if document.object_type == canonical_name(type_name) {
            Ok(())
        } else {
            Err(CoreError::not_found(canonical_name(type_name), id))
        }
    }

    /// Lists objects of a type matching every filter.
    ///
    /// # Errors
    ///
    /// Returns `FilterConversion` if a typed filter value cannot be coerced.
    pub fn list<I, K, V>(&self, type_name: &str, filters: I) -> CoreResult<Vec<Entity>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let session = self.session()?;
        let entities = match self.route(type_name)? {
            Route::Typed(descriptor) => self
                .typed()
                .list(&session, descriptor.name, filters)?
                .into_iter()
                .map(Entity::from)
                .collect(),
            Route::Document => self
                .documents()
                .list_by_type_filtered(&session, type_name, filters)?
                .into_iter()
                .map(Entity::from)
                .collect(),
        };
        Ok(entities)
    }

    /// Lists every object of a type.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn list_all(&self, type_name: &str) -> CoreResult<Vec<Entity>> {
        self.list(type_name, std::iter::empty::<(&str, &str)>())
    }

    /// Creates a master and its dependents atomically.
    ///
    /// Returns the master followed by each dependent, in order. For a typed
    /// master, dependents are linked to it by the link resolver; for a
    /// document master, each dependent must already name it via `ParentId`.
    ///
    /// # Errors
    ///
    /// Returns validation errors before any write, or `Aborted` carrying
    /// the cause if a write fails; nothing is stored on error.
    pub fn create_with_dependents(
        &self,
        master_type: &str,
        master_fields: FieldMap,
        sub_objects: Vec<SubObject>,
    ) -> CoreResult<Vec<Entity>> {
        let coordinator = self.coordinator();
        let created: Vec<Entity> = match self.route(master_type)? {
            Route::Typed(descriptor) => {
                let graph = self
                    .typed()
                    .prepare_with_dependents(descriptor.name, &master_fields, &sub_objects)?;
                let (master, children) = coordinator.run(|s| self.typed().insert_prepared(s, graph))?;
                std::iter::once(master)
                    .chain(children)
                    .map(Entity::from)
                    .collect()
            }
            Route::Document => self
                .documents()
                .create_transaction(&coordinator, master_type, &master_fields, &sub_objects)?
                .into_iter()
                .map(Entity::from)
                .collect(),
        };
        debug!(master_type, count = created.len(), "transaction created objects");
        Ok(created)
    }

    /// Executes a transaction request.
    ///
    /// # Errors
    ///
    /// See [`create_with_dependents`](Self::create_with_dependents).
    pub fn execute(&self, request: TransactionRequest) -> CoreResult<Vec<Entity>> {
        self.create_with_dependents(
            &request.master_object_type,
            request.master_fields,
            request.sub_objects,
        )
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("types", &self.registry.names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
