//! In-memory catalog of collection schemas.

use parking_lot::RwLock;

use super::CollectionSchema;

/// Ordered registry of every collection known to the store.
///
/// Enumeration order is registration order. The reverse-reference scan
/// visits collections in this order, so it is part of the observable
/// behavior of a delete.
#[derive(Debug, Default)]
pub struct Catalog {
    schemas: RwLock<Vec<CollectionSchema>>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog from schemas, in order.
    pub fn with_schemas(schemas: impl IntoIterator<Item = CollectionSchema>) -> Self {
        let catalog = Self::new();
        for schema in schemas {
            catalog.register(schema);
        }
        catalog
    }

    /// Register a schema.
    ///
    /// Re-registering an existing name replaces its declarations but keeps
    /// its enumeration position. Returns `true` if a schema was replaced.
    pub fn register(&self, schema: CollectionSchema) -> bool {
        let mut schemas = self.schemas.write();
        match schemas.iter_mut().find(|s| s.name == schema.name) {
            Some(existing) => {
                *existing = schema;
                true
            }
            None => {
                schemas.push(schema);
                false
            }
        }
    }

    /// Get a snapshot of a schema by collection name.
    pub fn get(&self, name: &str) -> Option<CollectionSchema> {
        self.schemas.read().iter().find(|s| s.name == name).cloned()
    }

    /// Check if a collection is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.read().iter().any(|s| s.name == name)
    }

    /// List all collection names in enumeration order.
    pub fn collection_names(&self) -> Vec<String> {
        self.schemas.read().iter().map(|s| s.name.clone()).collect()
    }

    /// Snapshot every schema in enumeration order.
    pub fn schemas(&self) -> Vec<CollectionSchema> {
        self.schemas.read().clone()
    }

    /// Number of registered collections.
    pub fn len(&self) -> usize {
        self.schemas.read().len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.schemas.read().is_empty()
    }
}
