//! Save, update and delete interception.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::document::{Document, UpdatePayload};
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::hook::{Hook, Operation, OperationKind};
use crate::reference::{ReferenceField, ReferenceValue};

use super::ReferenceGuard;

impl ReferenceGuard {
    /// Validate every reference field of a document about to be saved.
    pub async fn before_save(&self, document: &Document) -> Result<()> {
        let values = self.read_values(document.as_map(), |_| true);
        self.enforce(OperationKind::Save, values).await
    }

    /// Validate the reference fields assigned by an update payload.
    ///
    /// Fields the payload does not assign are never looked up.
    pub async fn before_update(&self, kind: OperationKind, payload: &UpdatePayload) -> Result<()> {
        let assignments = payload.assignments();
        let values = self.read_values(&assignments, |field| payload.assigns(&field.field));
        self.enforce(kind, values).await
    }

    /// Reject a delete whose documents are still referenced elsewhere.
    ///
    /// Single-document kinds protect the first match; `DeleteMany` protects
    /// every match. A filter matching nothing is allowed through.
    pub async fn before_delete(&self, kind: OperationKind, filter: &Filter) -> Result<()> {
        let found = if kind.is_multi() {
            self.store.find_ids(&self.collection, filter, None).await
        } else {
            self.store
                .find_one(&self.collection, filter)
                .await
                .map(|document| {
                    document
                        .and_then(|d| d.id(&self.identity_field))
                        .into_iter()
                        .collect()
                })
        };
        let ids: Vec<_> = found.map_err(|e| Error::database(kind.name(), e))?;

        if ids.is_empty() {
            if self.config.enable_logging {
                tracing::debug!(collection = %self.collection, %kind, "delete matches nothing");
            }
            return Ok(());
        }

        let living = self
            .scanner()
            .find_living_reference(&self.collection, &ids)
            .await?;

        match living {
            Some(living) => {
                tracing::warn!(
                    collection = %self.collection,
                    %kind,
                    id = %living.id,
                    referencing_collection = %living.referencing_collection,
                    "delete aborted: document still referenced"
                );
                Err(Error::ReferentialIntegrity {
                    collection: self.collection.clone(),
                    id: living.id.to_string(),
                    referencing_collection: living.referencing_collection,
                })
            }
            None => Ok(()),
        }
    }

    /// Pair each reference field selected by `include` with its value.
    fn read_values(
        &self,
        data: &Map<String, Value>,
        include: impl Fn(&ReferenceField) -> bool,
    ) -> Vec<(&ReferenceField, ReferenceValue)> {
        self.fields
            .iter()
            .filter(|field| include(*field))
            .map(|field| (field, field.read(data)))
            .collect()
    }

    /// Check values one by one, aborting at the first dangling reference.
    async fn enforce(
        &self,
        kind: OperationKind,
        values: Vec<(&ReferenceField, ReferenceValue)>,
    ) -> Result<()> {
        let validator = self.validator();

        for (field, value) in values {
            let valid = validator
                .validate(&field.target_collection, &value, &field.field)
                .await?;

            if !valid {
                tracing::warn!(
                    collection = %self.collection,
                    %kind,
                    field = %field.field,
                    value = %value,
                    target_collection = %field.target_collection,
                    "write aborted: dangling reference"
                );
                return Err(Error::ReferenceValidation {
                    collection: self.collection.clone(),
                    field: field.field.clone(),
                    value: value.to_string(),
                    target_collection: field.target_collection.clone(),
                });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Hook for ReferenceGuard {
    async fn before(&self, operation: &Operation<'_>) -> Result<()> {
        match *operation {
            Operation::Save { document, .. } => self.before_save(document).await,
            Operation::Update { kind, payload, .. } => self.before_update(kind, payload).await,
            Operation::Delete { kind, filter, .. } => self.before_delete(kind, filter).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::catalog::{Catalog, CollectionSchema, FieldDef};
    use crate::config::GuardConfig;
    use crate::test_support::MemoryStore;

    fn catalog() -> Arc<Catalog> {
        let line = CollectionSchema::new("LineItem").with_field(FieldDef::reference("tag", "Tag"));
        Arc::new(Catalog::with_schemas([
            CollectionSchema::new("User"),
            CollectionSchema::new("Tag"),
            CollectionSchema::new("Post")
                .with_field(FieldDef::scalar("title"))
                .with_field(FieldDef::reference("author", "User"))
                .with_field(FieldDef::reference_array("tags", "Tag"))
                .with_field(FieldDef::embedded_array("lines", line)),
            CollectionSchema::new("Comment").with_field(FieldDef::reference("post", "Post")),
        ]))
    }

    fn setup(collection: &str) -> (Arc<MemoryStore>, ReferenceGuard) {
        let store = Arc::new(MemoryStore::new());
        store.insert("User", "u1");
        store.insert("Tag", "t1");
        store.insert("Tag", "t2");
        let guard =
            ReferenceGuard::new(collection, catalog(), store.clone(), GuardConfig::default())
                .unwrap();
        (store, guard)
    }

    fn doc(value: serde_json::Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_save_with_valid_references() {
        let (_store, guard) = setup("Post");
        let post = doc(json!({"title": "Hi", "author": "u1", "tags": ["t1", "t2", "t1"]}));
        assert!(guard.before_save(&post).await.is_ok());
    }

    #[tokio::test]
    async fn test_save_with_missing_reference() {
        let (_store, guard) = setup("Post");
        let post = doc(json!({"author": "ghost"}));

        let err = guard.before_save(&post).await.unwrap_err();
        assert_eq!(
            err,
            Error::ReferenceValidation {
                collection: "Post".to_string(),
                field: "author".to_string(),
                value: "ghost".to_string(),
                target_collection: "User".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_save_fails_fast() {
        let (store, guard) = setup("Post");
        let post = doc(json!({"author": "ghost", "tags": ["t1"]}));

        assert!(guard.before_save(&post).await.is_err());
        assert_eq!(store.exists_calls(), 1);
        assert_eq!(store.count_calls(), 0);
    }

    #[tokio::test]
    async fn test_save_nested_array_reference() {
        let (_store, guard) = setup("Post");
        let post = doc(json!({"lines": [{"tag": "t1"}, {"tag": "t9"}]}));

        let err = guard.before_save(&post).await.unwrap_err();
        assert!(matches!(err, Error::ReferenceValidation { field, .. } if field == "lines"));
    }

    #[tokio::test]
    async fn test_update_skips_untouched_fields() {
        let (store, guard) = setup("Post");
        let payload = UpdatePayload::new().set("title", "New title");

        guard
            .before_update(OperationKind::UpdateMany, &payload)
            .await
            .unwrap();
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_update_checks_payload_value() {
        let (_store, guard) = setup("Post");

        let good = UpdatePayload::new().set("author", "u1");
        assert!(guard
            .before_update(OperationKind::UpdateOne, &good)
            .await
            .is_ok());

        let bad = UpdatePayload::from_value(json!({"tags": ["t1", "t3"]})).unwrap();
        let err = guard
            .before_update(OperationKind::FindOneAndUpdate, &bad)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReferenceValidation { field, .. } if field == "tags"));
    }

    #[tokio::test]
    async fn test_update_setting_null_is_allowed() {
        let (store, guard) = setup("Post");
        let payload = UpdatePayload::from_value(json!({"$set": {"author": null}})).unwrap();

        assert!(guard
            .before_update(OperationKind::UpdateOne, &payload)
            .await
            .is_ok());
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_blocked_by_living_reference() {
        let (store, guard) = setup("Post");
        store.insert_document("Post", doc(json!({"_id": "p1", "author": "u1"})));
        store.insert_document("Comment", doc(json!({"_id": "c1", "post": "p1"})));

        let err = guard
            .before_delete(OperationKind::DeleteOne, &Filter::by_id("_id", &"p1".into()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::ReferentialIntegrity {
                collection: "Post".to_string(),
                id: "p1".to_string(),
                referencing_collection: "Comment".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_delete_of_nothing_is_allowed() {
        let (store, guard) = setup("Post");
        let result = guard
            .before_delete(OperationKind::DeleteOne, &Filter::by_id("_id", &"nope".into()))
            .await;

        assert!(result.is_ok());
        assert_eq!(store.matching_calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_many_checks_every_match() {
        let (store, guard) = setup("Post");
        store.insert_document("Post", doc(json!({"_id": "p1", "title": "x"})));
        store.insert_document("Post", doc(json!({"_id": "p2", "title": "x"})));
        store.insert_document("Comment", doc(json!({"_id": "c1", "post": "p2"})));

        let filter = Filter::eq("title", "x");
        let single = guard.before_delete(OperationKind::DeleteOne, &filter).await;
        assert!(single.is_ok());

        let err = guard
            .before_delete(OperationKind::DeleteMany, &filter)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ReferentialIntegrity { id, .. } if id == "p2"));
    }

    #[tokio::test]
    async fn test_delete_lookup_failure_propagates() {
        let (store, guard) = setup("Post");
        store.insert_document("Post", doc(json!({"_id": "p1"})));
        store.fail_with("connection reset");

        let err = guard
            .before_delete(OperationKind::DeleteOne, &Filter::by_id("_id", &"p1".into()))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::Database {
                context: "deleteOne".to_string(),
                message: "connection reset".to_string(),
            }
        );
        assert_eq!(store.matching_calls(), 0);

        let err = guard
            .before_delete(OperationKind::DeleteMany, &Filter::All)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database { context, .. } if context == "deleteMany"));
    }

    #[tokio::test]
    async fn test_save_with_malformed_reference() {
        let (store, guard) = setup("Post");

        let post = doc(json!({"author": {"bogus": 1}}));
        let err = guard.before_save(&post).await.unwrap_err();
        assert_eq!(
            err,
            Error::ReferenceValidation {
                collection: "Post".to_string(),
                field: "author".to_string(),
                value: r#"{"bogus":1}"#.to_string(),
                target_collection: "User".to_string(),
            }
        );

        let post = doc(json!({"tags": [{"bogus": 1}, ["ghost"]]}));
        let err = guard.before_save(&post).await.unwrap_err();
        assert!(matches!(err, Error::ReferenceValidation { field, .. } if field == "tags"));

        let post = doc(json!({"author": true}));
        assert!(guard.before_save(&post).await.is_err());
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_hook_dispatch() {
        let (_store, guard) = setup("Post");
        let post = doc(json!({"author": "ghost"}));
        let op = Operation::Save {
            collection: "Post",
            document: &post,
        };

        assert!(guard.before(&op).await.is_err());
    }
}
