//! Work queue interface and in-memory implementation
//!
//! The crawler consumes repository identifiers from a FIFO queue. The broker
//! transport itself (Redis, SQS, ...) lives outside this crate; the trait
//! here is the boundary the core depends on. Items travel as raw JSON values
//! so that a timed-out task can push back exactly what it dequeued.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors that can occur during queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// A recognized crawl target parsed out of a raw queue message
///
/// Messages carry arbitrary JSON mappings; the crawler recognizes two shapes.
/// Everything else is dropped silently by the consuming task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// A repository addressed by owner and name, the primary crawl shape
    Repo { owner: String, name: String },

    /// A repository addressed by an opaque numeric id, needing owner/name
    /// resolution through the fetch client's optional lookup
    Id(u64),
}

impl WorkItem {
    /// Parses a raw queue message into a recognized work item
    ///
    /// # Returns
    ///
    /// * `Some(WorkItem)` - The message matched a recognized shape
    /// * `None` - Unrecognized shape; the caller should drop the message
    pub fn from_value(value: &Value) -> Option<WorkItem> {
        let map = value.as_object()?;

        if let (Some(owner), Some(name)) = (
            map.get("owner").and_then(Value::as_str),
            map.get("name").and_then(Value::as_str),
        ) {
            return Some(WorkItem::Repo {
                owner: owner.to_string(),
                name: name.to_string(),
            });
        }

        if let Some(id) = map.get("id").and_then(Value::as_u64) {
            return Some(WorkItem::Id(id));
        }

        None
    }
}

/// Trait for FIFO work queue implementations
///
/// Implementations must be safe for concurrent calls from multiple tasks.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Pushes one message onto the back of the queue
    async fn put(&self, item: Value) -> QueueResult<()>;

    /// Pops the front message, or `None` if the queue is empty
    async fn get(&self) -> QueueResult<Option<Value>>;

    /// Whether the queue currently holds no messages
    async fn is_empty(&self) -> QueueResult<bool>;

    /// Number of messages currently queued
    async fn len(&self) -> QueueResult<usize>;

    /// Removes every queued message
    async fn delete_all(&self) -> QueueResult<()>;
}

/// In-memory FIFO queue
///
/// Reference implementation of [`WorkQueue`] used by the binary's seeded mode
/// and by tests.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<Value>>,
}

impl MemoryQueue {
    /// Creates an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a queue pre-loaded with the given messages, front first
    pub fn seeded(items: impl IntoIterator<Item = Value>) -> Self {
        Self {
            items: Mutex::new(items.into_iter().collect()),
        }
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn put(&self, item: Value) -> QueueResult<()> {
        self.items.lock().await.push_back(item);
        Ok(())
    }

    async fn get(&self) -> QueueResult<Option<Value>> {
        Ok(self.items.lock().await.pop_front())
    }

    async fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.items.lock().await.is_empty())
    }

    async fn len(&self) -> QueueResult<usize> {
        Ok(self.items.lock().await.len())
    }

    async fn delete_all(&self) -> QueueResult<()> {
        self.items.lock().await.clear();
        Ok(())
    }
}
