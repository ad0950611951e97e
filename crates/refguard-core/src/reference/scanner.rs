//! Reverse-reference scanning for delete protection.
//!
//! Discovery walks the catalog for fields pointing at the affected
//! collection. Nothing is cached: every delete recomputes it, so schemas
//! registered after a guard was attached are still honored.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::document::DocumentId;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::store::DocumentStore;

use super::extractor::extract;

/// A collection holding fields that reference the affected collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencingCollection {
    /// Referencing collection name.
    pub collection: String,
    /// Query paths of its referencing fields.
    pub fields: Vec<String>,
}

/// A living reference that blocks a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivingReference {
    /// Identifier of the document that is still referenced.
    pub id: DocumentId,
    /// Collection holding the reference.
    pub referencing_collection: String,
}

/// Find every other collection that declares a reference to `affected`.
///
/// Collections appear in catalog order. Collections without such a field
/// are omitted, and the affected collection itself is never included.
pub fn scan_referencing_collections(affected: &str, catalog: &Catalog) -> Vec<ReferencingCollection> {
    catalog
        .schemas()
        .iter()
        .filter(|schema| schema.name != affected)
        .filter_map(|schema| {
            let mut fields: Vec<String> = Vec::new();
            for reference in extract(schema).iter().filter(|r| r.targets(affected)) {
                let path = reference.path();
                if !fields.contains(&path) {
                    fields.push(path);
                }
            }
            (!fields.is_empty()).then(|| ReferencingCollection {
                collection: schema.name.clone(),
                fields,
            })
        })
        .collect()
}

/// Check if any document in `referencing` still points at `target_id`.
///
/// Issues a single existence-limited query OR-ing all referencing fields.
pub async fn has_living_reference(
    store: &dyn DocumentStore,
    referencing: &ReferencingCollection,
    target_id: &DocumentId,
) -> Result<bool> {
    let filter = Filter::any_field_equals(&referencing.fields, target_id);
    store
        .exists_matching(&referencing.collection, &filter)
        .await
        .map_err(|e| Error::database(referencing.collection.as_str(), e))
}

/// Runs discovery and existence checks for the documents of one delete.
pub struct ReverseScanner<'a> {
    store: &'a dyn DocumentStore,
    catalog: &'a Catalog,
    logging: bool,
}

impl<'a> ReverseScanner<'a> {
    /// Create a scanner.
    pub fn new(store: &'a dyn DocumentStore, catalog: &'a Catalog) -> Self {
        Self {
            store,
            catalog,
            logging: false,
        }
    }

    /// Trace every existence check.
    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// Find the first living reference to any of `ids`.
    ///
    /// Identifiers are checked in the order given, collections in catalog
    /// order. Stops at the first hit. Performs no I/O when no collection
    /// references `affected`.
    pub async fn find_living_reference(
        &self,
        affected: &str,
        ids: &[DocumentId],
    ) -> Result<Option<LivingReference>> {
        let referencing = scan_referencing_collections(affected, self.catalog);
        if referencing.is_empty() {
            if self.logging {
                tracing::debug!(collection = affected, "no referencing collections");
            }
            return Ok(None);
        }

        for id in ids {
            for candidate in &referencing {
                let living = has_living_reference(self.store, candidate, id).await?;
                if self.logging {
                    tracing::debug!(
                        collection = affected,
                        id = %id,
                        referencing_collection = %candidate.collection,
                        fields = ?candidate.fields,
                        living,
                        "checked reverse reference"
                    );
                }
                if living {
                    return Ok(Some(LivingReference {
                        id: id.clone(),
                        referencing_collection: candidate.collection.clone(),
                    }));
                }
            }
        }

        Ok(None)
    }
}
