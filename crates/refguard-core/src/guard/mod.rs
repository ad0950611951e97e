//! Reference guard for one collection.
//!
//! A [`ReferenceGuard`] is created explicitly per collection with a
//! [`GuardConfig`]. Attaching it to a [`HookRegistry`] installs only the
//! hooks its configuration enables; a disabled path has no hook at all.

mod interceptor;
mod manual;

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::GuardConfig;
use crate::error::{Error, Result};
use crate::hook::{HookRegistry, OperationKind};
use crate::reference::{extract, ExistenceValidator, ReferenceField, ReverseScanner};
use crate::store::DocumentStore;

pub use manual::ValidationResult;

/// Referential integrity enforcement for one collection.
pub struct ReferenceGuard {
    collection: String,
    identity_field: String,
    fields: Vec<ReferenceField>,
    catalog: Arc<Catalog>,
    store: Arc<dyn DocumentStore>,
    config: GuardConfig,
}

impl ReferenceGuard {
    /// Create a guard for `collection`.
    ///
    /// The collection's reference fields are extracted once here and
    /// treated as read-only for the guard's lifetime.
    pub fn new(
        collection: &str,
        catalog: Arc<Catalog>,
        store: Arc<dyn DocumentStore>,
        config: GuardConfig,
    ) -> Result<Self> {
        config.validate()?;
        let schema = catalog
            .get(collection)
            .ok_or_else(|| Error::UnknownCollection(collection.to_string()))?;
        let fields = extract(&schema);

        if config.enable_logging {
            tracing::debug!(
                collection,
                reference_fields = fields.len(),
                "reference guard created"
            );
        }

        Ok(Self {
            collection: collection.to_string(),
            identity_field: schema.identity_field.clone(),
            fields,
            catalog,
            store,
            config,
        })
    }

    /// Install hooks for every enabled path.
    pub fn attach(self: &Arc<Self>, registry: &mut HookRegistry) {
        if self.config.enable_save {
            registry.before_operation(&[OperationKind::Save], self.clone());
        }
        if self.config.enable_update {
            registry.before_operation(&OperationKind::UPDATE_KINDS, self.clone());
        }
        if self.config.enable_delete {
            registry.before_operation(&OperationKind::DELETE_KINDS, self.clone());
        }
    }

    /// The guarded collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Reference fields declared by the guarded collection.
    pub fn reference_fields(&self) -> &[ReferenceField] {
        &self.fields
    }

    /// Configuration captured at construction.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    fn validator(&self) -> ExistenceValidator<'_> {
        ExistenceValidator::new(self.store.as_ref())
            .with_batch_size(self.config.batch_size)
            .with_logging(self.config.enable_logging)
    }

    fn scanner(&self) -> ReverseScanner<'_> {
        ReverseScanner::new(self.store.as_ref(), &self.catalog)
            .with_logging(self.config.enable_logging)
    }
}

impl std::fmt::Debug for ReferenceGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceGuard")
            .field("collection", &self.collection)
            .field("fields", &self.fields)
            .field("config", &self.config)
            .finish()
    }
}
