//! Collection handles and the guarded operation pipeline.
//!
//! Every mutating call builds an [`Operation`], runs the collection's
//! before-operation hooks, and only writes once they all pass. A hook error
//! surfaces as [`Error::Aborted`] and leaves the store untouched.

use serde_json::{Map, Value};
use tracing::debug;

use refguard_core::{
    CollectionSchema, Document, DocumentId, Filter, Operation, OperationKind, UpdatePayload,
    ValidationResult,
};

use crate::database::Database;
use crate::error::{Error, Result};

/// Handle to one registered collection.
#[derive(Debug)]
pub struct Collection<'a> {
    db: &'a Database,
    schema: CollectionSchema,
}

impl<'a> Collection<'a> {
    pub(crate) fn new(db: &'a Database, schema: CollectionSchema) -> Self {
        Self { db, schema }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Schema snapshot taken when the handle was created.
    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    // ========== Save ==========

    /// Insert or replace a document.
    ///
    /// A document without an identity gets a generated one. Returns the
    /// identity the document was stored under.
    pub async fn save(&self, mut document: Document) -> Result<DocumentId> {
        let identity_field = &self.schema.identity_field;
        let id = match document.id(identity_field) {
            Some(id) => id,
            None => {
                let id = DocumentId::generate();
                document.set(identity_field.as_str(), id.to_json());
                id
            }
        };

        self.run_hooks(&Operation::Save {
            collection: self.name(),
            document: &document,
        })
        .await?;

        self.db.engine().put(self.name(), &id, &document)?;
        debug!(collection = %self.name(), %id, "document saved");
        Ok(id)
    }

    /// Save a raw JSON value. Fails unless it is an object.
    pub async fn save_value(&self, value: Value) -> Result<DocumentId> {
        let document = Document::from_value(value)
            .ok_or_else(|| Error::InvalidDocument("expected a JSON object".to_string()))?;
        self.save(document).await
    }

    // ========== Reads ==========

    /// Get a document by identity.
    pub async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>> {
        self.db.engine().get(self.name(), id)
    }

    /// Find the first document matching `filter`.
    pub async fn find_one(&self, filter: &Filter) -> Result<Option<Document>> {
        let found = self.db.engine().find(self.name(), filter, Some(1))?;
        Ok(found.into_iter().next().map(|(_, document)| document))
    }

    /// Find every document matching `filter`, in store order.
    pub async fn find(&self, filter: &Filter) -> Result<Vec<Document>> {
        let found = self.db.engine().find(self.name(), filter, None)?;
        Ok(found.into_iter().map(|(_, document)| document).collect())
    }

    /// Count documents matching `filter`.
    pub async fn count(&self, filter: &Filter) -> Result<usize> {
        match filter {
            Filter::All => self.db.engine().document_count(self.name()),
            _ => Ok(self.db.engine().find(self.name(), filter, None)?.len()),
        }
    }

    // ========== Updates ==========

    /// Apply `payload` to the first matching document. Returns the number
    /// of documents modified.
    pub async fn update_one(&self, filter: &Filter, payload: &UpdatePayload) -> Result<u64> {
        let updated = self
            .update(OperationKind::UpdateOne, filter, payload, Some(1))
            .await?;
        Ok(updated.len() as u64)
    }

    /// Apply `payload` to every matching document.
    pub async fn update_many(&self, filter: &Filter, payload: &UpdatePayload) -> Result<u64> {
        let updated = self
            .update(OperationKind::UpdateMany, filter, payload, None)
            .await?;
        Ok(updated.len() as u64)
    }

    /// Apply `payload` to the first matching document and return it as
    /// updated.
    pub async fn find_one_and_update(
        &self,
        filter: &Filter,
        payload: &UpdatePayload,
    ) -> Result<Option<Document>> {
        let updated = self
            .update(OperationKind::FindOneAndUpdate, filter, payload, Some(1))
            .await?;
        Ok(updated.into_iter().next())
    }

    async fn update(
        &self,
        kind: OperationKind,
        filter: &Filter,
        payload: &UpdatePayload,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        self.run_hooks(&Operation::Update {
            kind,
            collection: self.name(),
            filter,
            payload,
        })
        .await?;

        let identity_field = self.schema.identity_field.as_str();
        let matched = self.db.engine().find(self.name(), filter, limit)?;
        let mut updated = Vec::with_capacity(matched.len());
        for (id, mut document) in matched {
            payload.apply(&mut document);
            // Identity is immutable.
            document.set(identity_field, id.to_json());
            self.db.engine().put(self.name(), &id, &document)?;
            updated.push(document);
        }

        debug!(collection = %self.name(), %kind, modified = updated.len(), "update applied");
        Ok(updated)
    }

    // ========== Deletes ==========

    /// Delete the first matching document. Returns the number deleted.
    pub async fn delete_one(&self, filter: &Filter) -> Result<u64> {
        let removed = self.delete(OperationKind::DeleteOne, filter, Some(1)).await?;
        Ok(removed.len() as u64)
    }

    /// Delete every matching document.
    pub async fn delete_many(&self, filter: &Filter) -> Result<u64> {
        let removed = self.delete(OperationKind::DeleteMany, filter, None).await?;
        Ok(removed.len() as u64)
    }

    /// Delete the first matching document and return it.
    pub async fn find_one_and_delete(&self, filter: &Filter) -> Result<Option<Document>> {
        let removed = self
            .delete(OperationKind::FindOneAndDelete, filter, Some(1))
            .await?;
        Ok(removed.into_iter().next())
    }

    /// Delete a document by identity.
    pub async fn delete_by_id(&self, id: &DocumentId) -> Result<u64> {
        let filter = Filter::by_id(&self.schema.identity_field, id);
        self.delete_one(&filter).await
    }

    async fn delete(
        &self,
        kind: OperationKind,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        self.run_hooks(&Operation::Delete {
            kind,
            collection: self.name(),
            filter,
        })
        .await?;

        let matched = self.db.engine().find(self.name(), filter, limit)?;
        let mut removed = Vec::with_capacity(matched.len());
        for (id, _) in matched {
            if let Some(document) = self.db.engine().remove(self.name(), &id)? {
                removed.push(document);
            }
        }

        debug!(collection = %self.name(), %kind, deleted = removed.len(), "delete applied");
        Ok(removed)
    }

    // ========== Manual validation ==========

    /// Report the validity of every present reference field in `data`.
    pub async fn validate_references(
        &self,
        data: &Map<String, Value>,
    ) -> Result<Vec<ValidationResult>> {
        let guard = self
            .db
            .guard(self.name())
            .ok_or_else(|| Error::NotGuarded(self.name().to_string()))?;
        guard.validate_references(data).await.map_err(Error::Guard)
    }

    /// Report the validity of every present reference field of a document.
    pub async fn check_references(&self, document: &Document) -> Result<Vec<ValidationResult>> {
        self.validate_references(document.as_map()).await
    }

    async fn run_hooks(&self, operation: &Operation<'_>) -> Result<()> {
        let Some(hooks) = self.db.hooks(self.name()) else {
            return Ok(());
        };
        hooks.run_before(operation).await.map_err(Error::Aborted)
    }
}
