//! JSON-lines document store
//!
//! Append-only persistence: every put appends one JSON line. Reads scan the
//! file and resolve duplicates last-write-wins, which preserves the store's
//! upsert-by-id semantics without rewriting the file on every write.

use crate::storage::{Document, ResultStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Document store appending JSON lines to a file on disk
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,

    /// Serializes appends so concurrent puts cannot interleave lines
    write_lock: Mutex<()>,
}

impl JsonlStore {
    /// Creates a store writing to the given file, creating parent directories
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the JSON-lines file; created on first put
    pub async fn new(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// The file this store appends to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the file into an id-keyed map, last write winning
    async fn read_all(&self) -> StoreResult<HashMap<String, Document>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        let mut documents = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let document: Document = serde_json::from_str(line)?;
            if let Some(key) = document.id_key() {
                documents.insert(key, document);
            }
        }
        Ok(documents)
    }
}

#[async_trait]
impl ResultStore for JsonlStore {
    async fn put(&self, document: &Document) -> StoreResult<()> {
        if document.id().is_none() {
            return Err(StoreError::MissingId);
        }

        let mut line = serde_json::to_string(document)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Document>> {
        Ok(self.read_all().await?.remove(id))
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.read_all().await?.len())
    }

    async fn delete_all(&self) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => Document::new(map),
            _ => panic!("test document must be an object"),
        }
    }

    async fn temp_store() -> (tempfile::TempDir, JsonlStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path().join("documents.jsonl"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_appends_and_get_reads_back() {
        let (_dir, store) = temp_store().await;

        store
            .put(&doc(json!({"id": "r1", "stargazers": 500})))
            .await
            .unwrap();
        store.put(&doc(json!({"id": "r2"}))).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        let fetched = store.get("r1").await.unwrap().unwrap();
        assert_eq!(fetched.get("stargazers"), Some(&json!(500)));
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let (_dir, store) = temp_store().await;

        store.put(&doc(json!({"id": "r1", "v": 1}))).await.unwrap();
        store.put(&doc(json!({"id": "r1", "v": 2}))).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let fetched = store.get("r1").await.unwrap().unwrap();
        assert_eq!(fetched.get("v"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_rejects_missing_id() {
        let (_dir, store) = temp_store().await;
        let err = store.put(&doc(json!({"v": 1}))).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingId));
    }

    #[tokio::test]
    async fn test_empty_store_reads() {
        let (_dir, store) = temp_store().await;
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.get("r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_all_removes_file() {
        let (_dir, store) = temp_store().await;
        store.put(&doc(json!({"id": "r1"}))).await.unwrap();

        store.delete_all().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);

        // Deleting an already-empty store is fine
        store.delete_all().await.unwrap();
    }
}
