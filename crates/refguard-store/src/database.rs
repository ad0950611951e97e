//! Database wrapper combining the storage engine, catalog and hooks.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use refguard_core::{
    Catalog, CollectionSchema, DocumentStore, GuardConfig, HookRegistry, ReferenceGuard,
};

use crate::collection::Collection;
use crate::config::StoreConfig;
use crate::engine::StorageEngine;
use crate::error::{Error, Result};

/// An embedded document database with per-collection hook pipelines.
pub struct Database {
    engine: Arc<StorageEngine>,
    catalog: Arc<Catalog>,
    hooks: DashMap<String, HookRegistry>,
    guards: DashMap<String, Arc<ReferenceGuard>>,
}

impl Database {
    /// Open a database, restoring persisted schemas in registration order.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let engine = StorageEngine::open(config)?;
        let catalog = Catalog::with_schemas(engine.load_schemas()?);

        info!(
            collections = catalog.len(),
            recovered = engine.was_recovered(),
            "database opened"
        );

        Ok(Self {
            engine: Arc::new(engine),
            catalog: Arc::new(catalog),
            hooks: DashMap::new(),
            guards: DashMap::new(),
        })
    }

    /// Open a temporary database that is removed on drop.
    pub fn temporary() -> Result<Self> {
        Self::open(StoreConfig::temporary())
    }

    /// Register or replace a collection schema.
    ///
    /// A replaced schema keeps its enumeration position. Guards already
    /// attached keep the declarations they were created with until they
    /// are attached again.
    pub fn register_collection(&self, schema: CollectionSchema) -> Result<()> {
        self.engine.save_schema(&schema)?;
        let name = schema.name.clone();
        let replaced = self.catalog.register(schema);
        info!(collection = %name, replaced, "collection registered");
        Ok(())
    }

    /// Attach a reference guard to a registered collection.
    ///
    /// Only the hooks enabled by `config` are installed. Attaching again
    /// replaces the previous guard and its hooks.
    pub fn attach_guard(&self, collection: &str, config: GuardConfig) -> Result<Arc<ReferenceGuard>> {
        let store: Arc<dyn DocumentStore> = self.engine.clone();
        let guard = Arc::new(
            ReferenceGuard::new(collection, self.catalog.clone(), store, config)
                .map_err(Error::Guard)?,
        );

        let mut registry = HookRegistry::new();
        guard.attach(&mut registry);
        info!(
            collection,
            hooks = registry.len(),
            reference_fields = guard.reference_fields().len(),
            "reference guard attached"
        );

        self.hooks.insert(collection.to_string(), registry);
        self.guards.insert(collection.to_string(), guard.clone());
        Ok(guard)
    }

    /// Remove the guard and hooks of a collection.
    pub fn detach_guard(&self, collection: &str) -> bool {
        self.hooks.remove(collection);
        self.guards.remove(collection).is_some()
    }

    /// Get a handle to a registered collection.
    pub fn collection(&self, name: &str) -> Result<Collection<'_>> {
        let schema = self
            .catalog
            .get(name)
            .ok_or_else(|| Error::UnknownCollection(name.to_string()))?;
        Ok(Collection::new(self, schema))
    }

    /// List all collection names in registration order.
    pub fn collection_names(&self) -> Vec<String> {
        self.catalog.collection_names()
    }

    /// Get a reference to the catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Get a reference to the storage engine.
    pub fn engine(&self) -> &StorageEngine {
        &self.engine
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.engine.flush()
    }

    /// Snapshot of the hooks installed on a collection.
    pub(crate) fn hooks(&self, collection: &str) -> Option<HookRegistry> {
        self.hooks.get(collection).map(|entry| entry.value().clone())
    }

    /// The guard attached to a collection.
    pub(crate) fn guard(&self, collection: &str) -> Option<Arc<ReferenceGuard>> {
        self.guards.get(collection).map(|entry| entry.value().clone())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("collections", &self.catalog.collection_names())
            .field("guarded", &self.guards.len())
            .finish()
    }
}
