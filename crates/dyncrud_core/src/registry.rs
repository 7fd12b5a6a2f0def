//! Type registry: resolves type names to their descriptors.

use crate::error::{CoreError, CoreResult};
use crate::schema::{EntityDescriptor, BUILTIN};
use std::collections::BTreeMap;

/// Rules for a document type: only the fields that must be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSchema {
    name: String,
    required: Vec<String>,
}

impl DocumentSchema {
    /// Creates a document schema.
    pub fn new<I, S>(name: impl Into<String>, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: canonical_name(&name.into()),
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the canonical type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the required field names.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.required
    }
}

/// What the registry knows about one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// A typed entity with a fixed schema.
    Typed(&'static EntityDescriptor),
    /// A document type with required fields only.
    Document(DocumentSchema),
}

impl TypeDescriptor {
    /// Returns the canonical type name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Typed(descriptor) => descriptor.name,
            TypeDescriptor::Document(schema) => schema.name(),
        }
    }

    /// Returns the required field names.
    #[must_use]
    pub fn required_fields(&self) -> Vec<&str> {
        match self {
            TypeDescriptor::Typed(descriptor) => descriptor.required.to_vec(),
            TypeDescriptor::Document(schema) => {
                schema.required.iter().map(String::as_str).collect()
            }
        }
    }

    /// Returns the typed descriptor, if this is a typed entity.
    #[must_use]
    pub fn as_typed(&self) -> Option<&'static EntityDescriptor> {
        match self {
            TypeDescriptor::Typed(descriptor) => Some(*descriptor),
            TypeDescriptor::Document(_) => None,
        }
    }
}

/// Canonical form of a type name: trimmed and lowercased.
#[must_use]
pub fn canonical_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Maps type names to descriptors.
///
/// Names are matched case-insensitively; `OrderProduct`, `orderProduct` and
/// `orderproduct` all resolve to the same entry. The registry is built once
/// and then shared read-only.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    entries: BTreeMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in typed entities.
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN
            .iter()
            .copied()
            .fold(Self::empty(), |registry, descriptor| registry.with_typed(descriptor))
    }

    /// Registers a typed entity.
    #[must_use]
    pub fn with_typed(mut self, descriptor: &'static EntityDescriptor) -> Self {
        self.entries
            .insert(descriptor.name.to_string(), TypeDescriptor::Typed(descriptor));
        self
    }

    /// Registers a document type with its required fields.
    ///
    /// A typed entity with the same name is replaced.
    #[must_use]
    pub fn with_document<I, S>(mut self, name: &str, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let schema = DocumentSchema::new(name, required);
        self.entries
            .insert(schema.name.clone(), TypeDescriptor::Document(schema));
        self
    }

    /// Returns the descriptor for a name, if registered.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeDescriptor> {
        self.entries.get(&canonical_name(name))
    }

    /// Resolves a name to its descriptor.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType`, listing every registered name, when the name
    /// matches nothing.
    pub fn resolve(&self, name: &str) -> CoreResult<&TypeDescriptor> {
        self.get(name).ok_or_else(|| CoreError::UnknownType {
            name: name.to_string(),
            known: self.names(),
        })
    }

    /// Resolves a name that must be a typed entity.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType`, listing the typed names, when the name is not
    /// a registered typed entity.
    pub fn resolve_typed(&self, name: &str) -> CoreResult<&'static EntityDescriptor> {
        self.get(name)
            .and_then(TypeDescriptor::as_typed)
            .ok_or_else(|| CoreError::UnknownType {
                name: name.to_string(),
                known: self.typed().map(|d| d.name.to_string()).collect(),
            })
    }

    /// Returns every registered name, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Iterates over the registered typed entities, sorted by name.
    pub fn typed(&self) -> impl Iterator<Item = &'static EntityDescriptor> + '_ {
        self.entries.values().filter_map(TypeDescriptor::as_typed)
    }

    /// Iterates over every descriptor, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.entries.values()
    }

    /// Returns the required fields of a registered type.
    #[must_use]
    pub fn required_fields(&self, name: &str) -> Option<Vec<&str>> {
        self.get(name).map(TypeDescriptor::required_fields)
    }
}
