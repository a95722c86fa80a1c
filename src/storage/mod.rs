//! Storage module for persisting crawled documents
//!
//! This module defines the document type produced by normalization, the
//! store trait the crawler writes through, and two backends:
//! - `MemoryStore` for tests and the binary's memory mode
//! - `JsonlStore` for append-only JSON-lines persistence on disk
//!
//! A production deployment would sit a real document database behind the
//! same trait; upsert-by-id is the only write semantic the core relies on.

mod jsonl;
mod memory;
mod traits;

pub use jsonl::JsonlStore;
pub use memory::MemoryStore;
pub use traits::{ResultStore, StoreError, StoreResult};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The normalized result of one successful crawl
///
/// A flat JSON mapping: scalar and array projections of the raw API response
/// plus a decoded numeric `repo_id`. Keyed by its `id` field for idempotent
/// upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(pub Map<String, Value>);

impl Document {
    /// Creates a document from a JSON mapping
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// The document's `id` field, if present
    pub fn id(&self) -> Option<&Value> {
        self.0.get("id")
    }

    /// The upsert key derived from the `id` field
    ///
    /// String ids are used as-is; any other JSON value is keyed by its
    /// serialized text.
    pub fn id_key(&self) -> Option<String> {
        match self.id()? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Looks up a field by name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}
