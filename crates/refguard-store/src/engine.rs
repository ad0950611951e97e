//! Storage engine implementation.

use async_trait::async_trait;
use sled::{Db, Tree};

use refguard_core::{BackendError, CollectionSchema, Document, DocumentId, DocumentStore, Filter};

use crate::config::StoreConfig;
use crate::error::{Error, Result};

/// Tree name for persisted collection schemas.
const CATALOG_TREE: &str = "catalog:schemas";

/// Prefix of per-collection document trees.
const COLLECTION_PREFIX: &str = "collection:";

/// The embedded document store wrapping sled.
///
/// Each collection lives in its own tree, keyed by document identity with
/// the JSON-encoded document as value. Store order is key order.
pub struct StorageEngine {
    /// The underlying sled database.
    db: Db,

    /// Collection schemas keyed by big-endian registration sequence.
    catalog_tree: Tree,
}

impl StorageEngine {
    /// Open or create a storage engine with the given configuration.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let db = config.to_sled_config().open()?;
        let catalog_tree = db.open_tree(CATALOG_TREE)?;

        Ok(Self { db, catalog_tree })
    }

    /// Check if the database was recovered from a previous run.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    // ========== Schemas ==========

    /// Persist a schema, replacing an existing one of the same name in place.
    pub fn save_schema(&self, schema: &CollectionSchema) -> Result<()> {
        let bytes = serde_json::to_vec(schema)?;

        let mut next_seq = 0u64;
        for entry in self.catalog_tree.iter() {
            let (key, value) = entry?;
            let stored: CollectionSchema = serde_json::from_slice(&value)?;
            if stored.name == schema.name {
                self.catalog_tree.insert(key, bytes)?;
                return Ok(());
            }
            next_seq = decode_seq(&key)? + 1;
        }

        self.catalog_tree.insert(next_seq.to_be_bytes(), bytes)?;
        Ok(())
    }

    /// Load every persisted schema in registration order.
    pub fn load_schemas(&self) -> Result<Vec<CollectionSchema>> {
        self.catalog_tree
            .iter()
            .values()
            .map(|value| -> Result<CollectionSchema> { Ok(serde_json::from_slice(&value?)?) })
            .collect()
    }

    // ========== Documents ==========

    /// Insert or replace a document, creating the collection's tree on first
    /// write.
    pub fn put(&self, collection: &str, id: &DocumentId, document: &Document) -> Result<()> {
        let bytes = serde_json::to_vec(document)?;
        self.db
            .open_tree(tree_name(collection))?
            .insert(id.as_str().as_bytes(), bytes)?;
        Ok(())
    }

    /// Get a document by identity.
    pub fn get(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>> {
        let Some(tree) = self.existing_tree(collection)? else {
            return Ok(None);
        };
        match tree.get(id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Check if a document exists.
    pub fn contains(&self, collection: &str, id: &DocumentId) -> Result<bool> {
        match self.existing_tree(collection)? {
            Some(tree) => Ok(tree.contains_key(id.as_str().as_bytes())?),
            None => Ok(false),
        }
    }

    /// Remove a document, returning it if it existed.
    pub fn remove(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>> {
        let Some(tree) = self.existing_tree(collection)? else {
            return Ok(None);
        };
        match tree.remove(id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Scan every document of a collection in store order.
    pub fn scan(
        &self,
        collection: &str,
    ) -> Result<impl Iterator<Item = Result<(DocumentId, Document)>>> {
        let tree = self.existing_tree(collection)?;
        Ok(tree.into_iter().flat_map(|tree| tree.iter()).map(
            |entry| -> Result<(DocumentId, Document)> {
                let (key, value) = entry?;
                Ok((decode_id(&key)?, serde_json::from_slice(&value)?))
            },
        ))
    }

    /// Collect documents matching `filter`, stopping after `limit` matches.
    pub fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<(DocumentId, Document)>> {
        let limit = limit.unwrap_or(usize::MAX);
        let mut found = Vec::new();
        if limit == 0 {
            return Ok(found);
        }

        for entry in self.scan(collection)? {
            let (id, document) = entry?;
            if filter.matches(&document) {
                found.push((id, document));
                if found.len() >= limit {
                    break;
                }
            }
        }
        Ok(found)
    }

    /// Number of documents stored in a collection.
    pub fn document_count(&self, collection: &str) -> Result<usize> {
        Ok(self
            .existing_tree(collection)?
            .map_or(0, |tree| tree.len()))
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Get the size on disk in bytes.
    pub fn size_on_disk(&self) -> Result<u64> {
        Ok(self.db.size_on_disk()?)
    }

    /// Get the underlying sled database.
    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Open a collection's tree only if a write has already created it.
    fn existing_tree(&self, collection: &str) -> Result<Option<Tree>> {
        let name = tree_name(collection);
        if !self.db.tree_names().iter().any(|n| &n[..] == name.as_bytes()) {
            return Ok(None);
        }
        Ok(Some(self.db.open_tree(name)?))
    }
}

fn tree_name(collection: &str) -> String {
    format!("{COLLECTION_PREFIX}{collection}")
}

fn decode_id(key: &[u8]) -> Result<DocumentId> {
    std::str::from_utf8(key)
        .map(DocumentId::from)
        .map_err(|_| Error::InvalidKey)
}

fn decode_seq(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| Error::InvalidKey)?;
    Ok(u64::from_be_bytes(bytes))
}

fn backend(err: Error) -> BackendError {
    BackendError::new(err.to_string())
}

#[async_trait]
impl DocumentStore for StorageEngine {
    async fn exists_by_id(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> std::result::Result<bool, BackendError> {
        self.contains(collection, id).map_err(backend)
    }

    async fn count_by_ids(
        &self,
        collection: &str,
        ids: &[DocumentId],
    ) -> std::result::Result<u64, BackendError> {
        let mut count = 0;
        for id in ids {
            if self.contains(collection, id).map_err(backend)? {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> std::result::Result<Option<Document>, BackendError> {
        let found = self.find(collection, filter, Some(1)).map_err(backend)?;
        Ok(found.into_iter().next().map(|(_, document)| document))
    }

    async fn find_ids(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> std::result::Result<Vec<DocumentId>, BackendError> {
        let found = self.find(collection, filter, limit).map_err(backend)?;
        Ok(found.into_iter().map(|(id, _)| id).collect())
    }

    async fn exists_matching(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> std::result::Result<bool, BackendError> {
        let found = self.find(collection, filter, Some(1)).map_err(backend)?;
        Ok(!found.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refguard_core::FieldDef;
    use serde_json::json;

    struct TestDb {
        engine: StorageEngine,
        _dir: tempfile::TempDir, // Keep the temp dir alive
    }

    impl std::ops::Deref for TestDb {
        type Target = StorageEngine;
        fn deref(&self) -> &Self::Target {
            &self.engine
        }
    }

    fn test_engine() -> TestDb {
        let dir = tempfile::tempdir().unwrap();
        let engine = StorageEngine::open(StoreConfig::new(dir.path())).unwrap();
        TestDb { engine, _dir: dir }
    }

    fn doc(value: serde_json::Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn test_put_get_remove() {
        let engine = test_engine();
        let id = DocumentId::from("u1");
        let user = doc(json!({"_id": "u1", "name": "Alice"}));

        engine.put("User", &id, &user).unwrap();
        assert_eq!(engine.get("User", &id).unwrap(), Some(user.clone()));
        assert!(engine.contains("User", &id).unwrap());
        assert!(!engine.contains("Post", &id).unwrap());

        assert_eq!(engine.remove("User", &id).unwrap(), Some(user));
        assert_eq!(engine.get("User", &id).unwrap(), None);
    }

    #[test]
    fn test_find_with_limit() {
        let engine = test_engine();
        for (id, title) in [("p1", "x"), ("p2", "y"), ("p3", "x")] {
            let post = doc(json!({"_id": id, "title": title}));
            engine.put("Post", &id.into(), &post).unwrap();
        }

        let filter = Filter::eq("title", "x");
        let all = engine.find("Post", &filter, None).unwrap();
        let ids: Vec<_> = all.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p3"]);

        assert_eq!(engine.find("Post", &filter, Some(1)).unwrap().len(), 1);
        assert!(engine.find("Post", &filter, Some(0)).unwrap().is_empty());
    }

    #[test]
    fn test_schema_order_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let engine = StorageEngine::open(StoreConfig::new(dir.path())).unwrap();
            engine.save_schema(&CollectionSchema::new("User")).unwrap();
            engine.save_schema(&CollectionSchema::new("Post")).unwrap();
            engine.save_schema(&CollectionSchema::new("Comment")).unwrap();
            engine
                .save_schema(
                    &CollectionSchema::new("User").with_field(FieldDef::scalar("name")),
                )
                .unwrap();
            engine.flush().unwrap();
        }

        let engine = StorageEngine::open(StoreConfig::new(dir.path())).unwrap();
        let schemas = engine.load_schemas().unwrap();
        let names: Vec<_> = schemas.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["User", "Post", "Comment"]);
        assert!(schemas[0].get_field("name").is_some());
    }

    #[tokio::test]
    async fn test_document_store_capabilities() {
        let engine = test_engine();
        for id in ["A", "B"] {
            engine
                .put("User", &id.into(), &doc(json!({"_id": id})))
                .unwrap();
        }
        engine
            .put("Team", &"t1".into(), &doc(json!({"_id": "t1", "members": ["A", "B"]})))
            .unwrap();

        let store: &dyn DocumentStore = &*engine;
        assert!(store.exists_by_id("User", &"A".into()).await.unwrap());
        assert!(!store.exists_by_id("User", &"C".into()).await.unwrap());
        assert_eq!(
            store
                .count_by_ids("User", &["A".into(), "C".into(), "B".into()])
                .await
                .unwrap(),
            2
        );

        let members = Filter::any_field_equals(&["members".to_string()], &"B".into());
        assert!(store.exists_matching("Team", &members).await.unwrap());
        assert_eq!(
            store.find_ids("Team", &members, None).await.unwrap(),
            vec![DocumentId::from("t1")]
        );
        assert!(store.find_one("Team", &Filter::eq("members", "Z")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reads_do_not_create_trees() {
        let engine = test_engine();
        let ghost = DocumentId::from("g1");

        assert!(!engine.contains("Ghost", &ghost).unwrap());
        assert_eq!(engine.get("Ghost", &ghost).unwrap(), None);
        assert_eq!(engine.remove("Ghost", &ghost).unwrap(), None);
        assert_eq!(engine.document_count("Ghost").unwrap(), 0);
        assert!(engine.find("Ghost", &Filter::All, None).unwrap().is_empty());

        let store: &dyn DocumentStore = &*engine;
        assert!(!store.exists_by_id("Ghost", &ghost).await.unwrap());
        assert!(!store.exists_matching("Ghost", &Filter::All).await.unwrap());

        let names = engine.db().tree_names();
        assert!(!names.iter().any(|n| &n[..] == b"collection:Ghost"));

        engine.put("Ghost", &ghost, &doc(json!({"_id": "g1"}))).unwrap();
        assert!(engine.db().tree_names().iter().any(|n| &n[..] == b"collection:Ghost"));
        assert!(engine.contains("Ghost", &ghost).unwrap());
    }
}
