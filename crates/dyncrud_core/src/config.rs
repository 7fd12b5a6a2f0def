//! Engine configuration.

/// How the link resolver picks the field that points a child at its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStrategy {
    /// Use the child's declared foreign key to the parent type, falling back
    /// to field-name matching when the child declares none.
    #[default]
    DeclaredThenHeuristic,
    /// Only use declared foreign keys; children without one are left as-is.
    DeclaredOnly,
}

/// How deep a document delete follows parent references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CascadeMode {
    /// Delete every transitive dependent.
    #[default]
    Recursive,
    /// Delete direct dependents only.
    OneLevel,
}

/// Configuration for an entity engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Reject document operations on types the registry doesn't know.
    pub strict_document_types: bool,

    /// Route every type name to the document path, typed names included.
    pub documents_only: bool,

    /// Link resolution strategy for sub-objects.
    pub link_strategy: LinkStrategy,

    /// Cascade depth for document deletes.
    pub cascade: CascadeMode,

    /// Check typed foreign keys on insert, update and delete.
    pub enforce_foreign_keys: bool,

    /// Table holding documents.
    pub document_table: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict_document_types: false,
            documents_only: false,
            link_strategy: LinkStrategy::default(),
            cascade: CascadeMode::default(),
            enforce_foreign_keys: true,
            document_table: "dynamic_objects".to_string(),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether unknown document types are rejected.
    #[must_use]
    pub const fn strict_document_types(mut self, value: bool) -> Self {
        self.strict_document_types = value;
        self
    }

    /// Sets whether every type is stored as a document.
    #[must_use]
    pub const fn documents_only(mut self, value: bool) -> Self {
        self.documents_only = value;
        self
    }

    /// Sets the link resolution strategy.
    #[must_use]
    pub const fn link_strategy(mut self, strategy: LinkStrategy) -> Self {
        self.link_strategy = strategy;
        self
    }

    /// Sets the document cascade depth.
    #[must_use]
    pub const fn cascade(mut self, mode: CascadeMode) -> Self {
        self.cascade = mode;
        self
    }

    /// Sets whether typed foreign keys are enforced.
    #[must_use]
    pub const fn enforce_foreign_keys(mut self, value: bool) -> Self {
        self.enforce_foreign_keys = value;
        self
    }

    /// Sets the document table name.
    #[must_use]
    pub fn document_table(mut self, table: impl Into<String>) -> Self {
        self.document_table = table.into();
        self
    }
}
