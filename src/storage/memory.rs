//! In-memory document store

use crate::storage::{Document, ResultStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Upsert-by-id store backed by a hash map
///
/// Reference implementation of [`ResultStore`], used by tests and the
/// binary's memory mode.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, Document>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn put(&self, document: &Document) -> StoreResult<()> {
        let key = document.id_key().ok_or(StoreError::MissingId)?;
        self.documents.lock().await.insert(key, document.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Document>> {
        Ok(self.documents.lock().await.get(id).cloned())
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.documents.lock().await.len())
    }

    async fn delete_all(&self) -> StoreResult<()> {
        self.documents.lock().await.clear();
        Ok(())
    }
}
