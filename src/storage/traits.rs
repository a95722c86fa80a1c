//! Store trait and error types

use crate::storage::Document;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document is missing the required 'id' field")]
    MissingId,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for document store implementations
///
/// Writes are upserts keyed by the document's `id` field. Implementations
/// must be safe for concurrent calls from multiple tasks.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Upserts one document by its `id`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Document written (inserted or replaced)
    /// * `Err(StoreError::MissingId)` - The document has no `id` field
    async fn put(&self, document: &Document) -> StoreResult<()>;

    /// Fetches a document by id, or `None` if absent
    async fn get(&self, id: &str) -> StoreResult<Option<Document>>;

    /// Number of stored documents
    async fn count(&self) -> StoreResult<usize>;

    /// Removes every stored document
    async fn delete_all(&self) -> StoreResult<()>;
}
