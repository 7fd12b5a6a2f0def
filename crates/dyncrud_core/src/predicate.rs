//! Equality filters over typed records.

use crate::error::{CoreError, CoreResult};
use crate::schema::{EntityDescriptor, Record};
use crate::value::{coerce_str, Value};
use tracing::debug;

/// One `field == value` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// Canonical field name.
    pub field: &'static str,
    /// Value the field must equal.
    pub value: Value,
}

/// A conjunction of equality clauses over one typed entity.
///
/// An empty predicate matches every record of its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    descriptor: &'static EntityDescriptor,
    clauses: Vec<Clause>,
}

impl Predicate {
    /// Returns a predicate matching every record of the type.
    #[must_use]
    pub fn all(descriptor: &'static EntityDescriptor) -> Self {
        Self {
            descriptor,
            clauses: Vec::new(),
        }
    }

    /// Returns the clauses, in filter order.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Returns true if the predicate has no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Returns true if `record` is of the predicate's type and satisfies
    /// every clause.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        record.descriptor() == self.descriptor
            && self
                .clauses
                .iter()
                .all(|clause| record.get(clause.field).as_ref() == Some(&clause.value))
    }
}

/// Builds a [`Predicate`] from string filters.
///
/// Filter keys are matched to schema fields ignoring ASCII case. Keys that
/// match no field are dropped; values are coerced to the field's declared
/// type.
#[derive(Debug, Clone, Copy)]
pub struct PredicateBuilder {
    descriptor: &'static EntityDescriptor,
}

impl PredicateBuilder {
    /// Creates a builder for one typed entity.
    #[must_use]
    pub const fn new(descriptor: &'static EntityDescriptor) -> Self {
        Self { descriptor }
    }

    /// Builds the predicate.
    ///
    /// # Errors
    ///
    /// Returns `FilterConversion` for the first value that cannot be
    /// coerced to its field's type.
    pub fn build<I, K, V>(&self, filters: I) -> CoreResult<Predicate>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut predicate = Predicate::all(self.descriptor);
        for (key, raw) in filters {
            let (key, raw) = (key.as_ref(), raw.as_ref());
            let Some(def) = self.descriptor.field(key) else {
                debug!(type_name = self.descriptor.name, field = key, "ignoring filter on unknown field");
                continue;
            };
            let value = coerce_str(raw, def.ty).ok_or_else(|| CoreError::FilterConversion {
                field: def.name.to_string(),
                from: "string".to_string(),
                to: def.ty.name().to_string(),
                value: raw.to_string(),
            })?;
            predicate.clauses.push(Clause {
                field: def.name,
                value,
            });
        }
        Ok(predicate)
    }
}
