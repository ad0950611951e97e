//! Capabilities the engine requires from the surrounding document store.

use async_trait::async_trait;

use crate::document::{Document, DocumentId};
use crate::error::BackendError;
use crate::filter::Filter;

/// Read-only lookups the reference engine issues against a document store.
///
/// Collections are addressed by name. Every method may suspend on I/O, and
/// any failure is reported as a [`BackendError`] rather than as a negative
/// answer.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Check if a document with `id` exists in `collection`.
    async fn exists_by_id(&self, collection: &str, id: &DocumentId) -> Result<bool, BackendError>;

    /// Count the documents of `collection` whose identity is in `ids`.
    async fn count_by_ids(&self, collection: &str, ids: &[DocumentId])
        -> Result<u64, BackendError>;

    /// Find the first document matching `filter`. Resolves the target of a
    /// single-document delete.
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, BackendError>;

    /// Resolve the identities of documents matching `filter`, in store order.
    async fn find_ids(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<DocumentId>, BackendError>;

    /// Existence-limited query: stop at the first document matching `filter`.
    async fn exists_matching(&self, collection: &str, filter: &Filter)
        -> Result<bool, BackendError>;
}
