//! Document store: the schema-less persistence path.

use super::matching::{has_parent, matches_filters, own_key, PARENT_ID};
use super::{Document, DocumentRow};
use crate::config::{CascadeMode, Config};
use crate::coordinator::{TransactionCoordinator, WriteOp};
use crate::error::{CoreError, CoreResult};
use crate::fields::FieldMap;
use crate::registry::{canonical_name, TypeRegistry};
use crate::request::SubObject;
use crate::schema::{decode_cbor, encode_cbor};
use crate::session::Session;
use crate::validate::FieldValidator;
use chrono::Utc;
use dyncrud_storage::RowKey;
use serde_json::Value as JsonValue;
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, warn};

/// Reads and writes documents through a session.
#[derive(Debug, Clone, Copy)]
pub struct DocumentStore<'a> {
    registry: &'a TypeRegistry,
    config: &'a Config,
}

impl<'a> DocumentStore<'a> {
    /// Creates a document store.
    #[must_use]
    pub fn new(registry: &'a TypeRegistry, config: &'a Config) -> Self {
        Self { registry, config }
    }

    fn table(&self) -> &str {
        &self.config.document_table
    }

    /// Canonicalizes a type name, rejecting unregistered names in strict
    /// mode.
    fn accept_type(&self, type_name: &str) -> CoreResult<String> {
        if self.config.strict_document_types {
            self.registry.resolve(type_name)?;
        }
        Ok(canonical_name(type_name))
    }

    fn prepare(&self, type_name: &str, fields: &FieldMap) -> CoreResult<DocumentRow> {
        let object_type = self.accept_type(type_name)?;
        FieldValidator::new(self.registry).validate(&object_type, fields)?;
        Ok(DocumentRow {
            object_type,
            payload: fields.to_json_string()?,
            created_at: Utc::now(),
        })
    }

    /// Stores a new document.
    ///
    /// # Errors
    ///
    /// Returns `MissingFields` if the type has registered required fields
    /// that are absent, or `UnknownType` for unregistered types in strict
    /// mode.
    pub fn create(
        &self,
        session: &mut Session<'_>,
        type_name: &str,
        fields: &FieldMap,
    ) -> CoreResult<Document> {
        let row = self.prepare(type_name, fields)?;
        let key = session.insert(self.table(), encode_cbor(&row)?)?;
        debug!(id = key.as_i64(), object_type = %row.object_type, "document created");
        Ok(row.into_document(key.as_i64()))
    }

    /// Loads a document by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no document has this id.
    pub fn get_by_id(&self, session: &Session<'_>, id: i64) -> CoreResult<Document> {
        let bytes = session
            .get(self.table(), RowKey::new(id))?
            .ok_or_else(|| CoreError::not_found("document", id))?;
        Ok(decode_cbor::<DocumentRow>(&bytes)?.into_document(id))
    }

    fn scan(&self, session: &Session<'_>) -> CoreResult<Vec<Document>> {
        session
            .scan(self.table())?
            .into_iter()
            .map(|(key, bytes)| {
                decode_cbor::<DocumentRow>(&bytes).map(|row| row.into_document(key.as_i64()))
            })
            .collect()
    }

    /// Lists every document of a type, in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn list_by_type(&self, session: &Session<'_>, type_name: &str) -> CoreResult<Vec<Document>> {
        let object_type = self.accept_type(type_name)?;
        Ok(self
            .scan(session)?
            .into_iter()
            .filter(|doc| doc.object_type == object_type)
            .collect())
    }

    /// Lists documents of a type whose payload matches every filter.
    ///
    /// A filter matches when the payload has a field with exactly that name
    /// whose scalar value renders as the filter string. Documents with an
    /// unreadable payload are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub fn list_by_type_filtered<I, K, V>(
        &self,
        session: &Session<'_>,
        type_name: &str,
        filters: I,
    ) -> CoreResult<Vec<Document>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let filters: Vec<(String, String)> = filters
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();

        let mut matched = Vec::new();
        for doc in self.list_by_type(session, type_name)? {
            match doc.fields() {
                Ok(fields) if matches_filters(&fields, &filters) => matched.push(doc),
                Ok(_) => {}
                Err(e) => warn!(id = doc.id, error = %e, "skipping unreadable document"),
            }
        }
        Ok(matched)
    }

    /// Replaces a document's payload.
    ///
    /// The type and creation time are kept; the new fields are validated
    /// against the document's type.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no document has this id, or `MissingFields`
    /// if required fields are absent.
    pub fn update(
        &self,
        session: &mut Session<'_>,
        id: i64,
        fields: &FieldMap,
    ) -> CoreResult<Document> {
        let current = self.get_by_id(session, id)?;
        FieldValidator::new(self.registry).validate(&current.object_type, fields)?;

        let row = DocumentRow {
            object_type: current.object_type,
            payload: fields.to_json_string()?,
            created_at: current.created_at,
        };
        session.update(self.table(), RowKey::new(id), encode_cbor(&row)?)?;
        Ok(row.into_document(id))
    }

    /// Deletes a document and its dependents.
    ///
    /// Dependents are documents whose `ParentId` equals the deleted
    /// document's own key (see [`own_key`](super::own_key)). With
    /// [`CascadeMode::Recursive`] dependents' dependents follow in turn.
    /// Returns the ids of every removed document, the target last.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no document has this id.
    pub fn delete(&self, session: &mut Session<'_>, id: i64) -> CoreResult<Vec<i64>> {
        let target = self.get_by_id(session, id)?;
        let target_fields = target.fields()?;

        let mut removed = BTreeSet::from([id]);
        let mut dependents = Vec::new();
        let mut frontier: VecDeque<JsonValue> = own_key(&target_fields)
            .map(|(_, key)| key.clone())
            .into_iter()
            .collect();

        if !frontier.is_empty() {
            let candidates: Vec<(i64, FieldMap)> = self
                .scan(session)?
                .into_iter()
                .filter(|doc| doc.id != id)
                .filter_map(|doc| match doc.fields() {
                    Ok(fields) => Some((doc.id, fields)),
                    Err(e) => {
                        warn!(id = doc.id, error = %e, "skipping unreadable document in cascade");
                        None
                    }
                })
                .collect();

            while let Some(key) = frontier.pop_front() {
                for (doc_id, fields) in &candidates {
                    if removed.contains(doc_id) || !has_parent(fields, &key) {
                        continue;
                    }
                    removed.insert(*doc_id);
                    dependents.push(*doc_id);
                    if self.config.cascade == CascadeMode::Recursive {
                        if let Some((_, child_key)) = own_key(fields) {
                            frontier.push_back(child_key.clone());
                        }
                    }
                }
            }
        }

        for doc_id in &dependents {
            session.remove(self.table(), RowKey::new(*doc_id))?;
        }
        session.remove(self.table(), RowKey::new(id))?;
        debug!(id, dependents = dependents.len(), "document deleted");

        dependents.push(id);
        Ok(dependents)
    }

    /// Creates a master document and its sub-documents atomically.
    ///
    /// The master must carry its own key (see [`own_key`](super::own_key))
    /// and every sub-object must carry a `ParentId` equal to it. All checks
    /// run before the first write.
    ///
    /// # Errors
    ///
    /// Returns `ValidationMismatch` or `MissingFields` before any write, or
    /// `Aborted` if a write fails; in every case nothing is stored.
    pub fn create_transaction(
        &self,
        coordinator: &TransactionCoordinator<'_>,
        master_type: &str,
        master_fields: &FieldMap,
        sub_objects: &[SubObject],
    ) -> CoreResult<Vec<Document>> {
        let master_key = own_key(master_fields)
            .map(|(_, key)| key.clone())
            .ok_or_else(|| {
                CoreError::validation_mismatch("master object must contain an id field")
            })?;

        let mut rows = vec![self.prepare(master_type, master_fields)?];
        for (index, sub) in sub_objects.iter().enumerate() {
            let parent = sub.fields.get(PARENT_ID).ok_or_else(|| {
                CoreError::validation_mismatch(format!(
                    "sub-object {index} ({}) has no {PARENT_ID}",
                    sub.object_type
                ))
            })?;
            if !has_parent(&sub.fields, &master_key) {
                return Err(CoreError::validation_mismatch(format!(
                    "sub-object {index} ({}) has {PARENT_ID} {parent} but the master's key is {master_key}",
                    sub.object_type
                )));
            }
            rows.push(self.prepare(&sub.object_type, &sub.fields)?);
        }

        let writes = rows
            .iter()
            .map(|row| {
                Ok(WriteOp::Insert {
                    table: self.table().to_string(),
                    payload: encode_cbor(row)?,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let keys = coordinator.run_transactional(writes)?;
        rows.into_iter()
            .zip(keys)
            .map(|(row, key)| {
                let key = key.ok_or_else(|| CoreError::codec("insert returned no key"))?;
                Ok(row.into_document(key.as_i64()))
            })
            .collect()
    }
}
