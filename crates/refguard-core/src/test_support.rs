//! In-memory store used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::catalog::DEFAULT_IDENTITY_FIELD;
use crate::document::{Document, DocumentId};
use crate::error::BackendError;
use crate::filter::Filter;
use crate::store::DocumentStore;

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    failure: Mutex<Option<String>>,
    exists: AtomicUsize,
    count: AtomicUsize,
    find: AtomicUsize,
    matching: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a bare document carrying only its identity.
    pub fn insert(&self, collection: &str, id: &str) {
        self.insert_document(collection, Document::new().with(DEFAULT_IDENTITY_FIELD, id));
    }

    pub fn insert_document(&self, collection: &str, document: Document) {
        self.collections
            .lock()
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// Make every subsequent lookup fail with `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock() = Some(message.to_string());
    }

    pub fn exists_calls(&self) -> usize {
        self.exists.load(Ordering::SeqCst)
    }

    pub fn count_calls(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn find_calls(&self) -> usize {
        self.find.load(Ordering::SeqCst)
    }

    pub fn matching_calls(&self) -> usize {
        self.matching.load(Ordering::SeqCst)
    }

    /// Total lookups of any kind.
    pub fn calls(&self) -> usize {
        self.exists_calls() + self.count_calls() + self.find_calls() + self.matching_calls()
    }

    fn check_failure(&self) -> Result<(), BackendError> {
        match self.failure.lock().as_ref() {
            Some(message) => Err(BackendError::new(message.clone())),
            None => Ok(()),
        }
    }

    fn matching(&self, collection: &str, filter: &Filter) -> Vec<Document> {
        self.collections
            .lock()
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn exists_by_id(&self, collection: &str, id: &DocumentId) -> Result<bool, BackendError> {
        self.exists.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let filter = Filter::by_id(DEFAULT_IDENTITY_FIELD, id);
        Ok(!self.matching(collection, &filter).is_empty())
    }

    async fn count_by_ids(
        &self,
        collection: &str,
        ids: &[DocumentId],
    ) -> Result<u64, BackendError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let filter = Filter::ids_in(DEFAULT_IDENTITY_FIELD, ids);
        Ok(self.matching(collection, &filter).len() as u64)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, BackendError> {
        self.find.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.matching(collection, filter).into_iter().next())
    }

    async fn find_ids(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<DocumentId>, BackendError> {
        self.find.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self
            .matching(collection, filter)
            .iter()
            .filter_map(|d| d.id(DEFAULT_IDENTITY_FIELD))
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn exists_matching(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<bool, BackendError> {
        self.matching.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(!self.matching(collection, filter).is_empty())
    }
}
