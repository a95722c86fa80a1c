//! One crawl task: credential, dequeue, fetch, normalize, store, report
//!
//! Error policy, in one line: slow infrastructure requeues, malformed data
//! drops. Timeouts on checkout, store writes, and quota reports push the
//! literal dequeued message back onto the queue; shape mismatches and parse
//! failures consume the item without retry. Nothing escapes to the admission
//! loop.

use crate::config::CrawlerConfig;
use crate::credentials::CredentialPool;
use crate::github::{extract_rate_limit, normalize_repository, FetchClient};
use crate::queue::{WorkItem, WorkQueue};
use crate::storage::ResultStore;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// The unit of crawl work: processes exactly one queued item
///
/// Cloning is cheap; the scheduler clones one template task per admission.
#[derive(Clone)]
pub struct CrawlTask {
    pool: Arc<CredentialPool>,
    queue: Arc<dyn WorkQueue>,
    store: Arc<dyn ResultStore>,
    client: Arc<dyn FetchClient>,
    checkout_timeout: Duration,
    io_timeout: Duration,
}

impl CrawlTask {
    /// Creates a task template bound to the crawler's collaborators
    pub fn new(
        pool: Arc<CredentialPool>,
        queue: Arc<dyn WorkQueue>,
        store: Arc<dyn ResultStore>,
        client: Arc<dyn FetchClient>,
        config: &CrawlerConfig,
    ) -> Self {
        Self {
            pool,
            queue,
            store,
            client,
            checkout_timeout: config.checkout_timeout(),
            io_timeout: config.io_timeout(),
        }
    }

    /// Runs one crawl cycle to completion
    ///
    /// Exactly one of three side effects occurs: a document is written (with
    /// the quota possibly updated), the item is requeued, or the item is
    /// silently dropped. Never more than one store write per task.
    pub async fn run(&self) {
        // Credential first; the item is not dequeued yet, so giving up here
        // leaves it queued for the next task.
        let key = match timeout(self.checkout_timeout, self.pool.checkout()).await {
            Ok(key) => key,
            Err(_) => {
                tracing::warn!("Credential checkout timed out, abandoning task");
                return;
            }
        };

        let message = match self.queue.get().await {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Failed to dequeue work item: {}", e);
                return;
            }
        };

        let Some(WorkItem::Repo { owner, name }) = WorkItem::from_value(&message) else {
            tracing::debug!("Dropping queue message without an owner/name shape");
            return;
        };

        let raw = match self.client.fetch_repository(&owner, &name, &key).await {
            Ok(raw) => raw,
            Err(e) if e.is_timeout() => {
                tracing::debug!("Fetch timed out for {}/{}, requeueing", owner, name);
                self.requeue(message).await;
                return;
            }
            Err(e) => {
                tracing::warn!("Fetch failed for {}/{}, dropping: {}", owner, name, e);
                return;
            }
        };

        let document = match normalize_repository(&raw) {
            Ok(document) => document,
            Err(e) => {
                tracing::debug!("Malformed response for {}/{}, dropping: {}", owner, name, e);
                return;
            }
        };

        match timeout(self.io_timeout, self.store.put(&document)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!("Store rejected document for {}/{}: {}", owner, name, e);
                return;
            }
            Err(_) => {
                tracing::debug!("Store write timed out for {}/{}, requeueing", owner, name);
                self.requeue(message).await;
                return;
            }
        }

        // Quota rides along in the same response; a missing block means
        // success without a quota update, not a failed crawl.
        let Ok(limit) = extract_rate_limit(&raw) else {
            return;
        };
        let report = self.pool.report(&key, limit.remaining, Some(limit.reset_at));
        if timeout(self.io_timeout, report).await.is_err() {
            tracing::debug!("Quota report timed out for {}/{}, requeueing", owner, name);
            self.requeue(message).await;
        }
    }

    /// Pushes the original dequeued message back onto the queue
    async fn requeue(&self, message: Value) {
        if let Err(e) = self.queue.put(message).await {
            tracing::warn!("Failed to requeue item after timeout: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Credential, QuotaProbe, RateLimit};
    use crate::github::FetchError;
    use crate::queue::MemoryQueue;
    use crate::storage::{Document, MemoryStore, StoreResult};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use serde_json::json;

    struct StubProbe;

    #[async_trait]
    impl QuotaProbe for StubProbe {
        async fn probe(&self, _key: &str) -> Result<RateLimit, FetchError> {
            Ok(RateLimit {
                remaining: 5000,
                reset_at: Utc::now() + ChronoDuration::hours(1),
            })
        }
    }

    /// Fetch stub returning one canned response for every repository
    struct StubFetch {
        response: Value,
    }

    #[async_trait]
    impl FetchClient for StubFetch {
        async fn fetch_repository(
            &self,
            _owner: &str,
            _name: &str,
            _key: &str,
        ) -> Result<Value, FetchError> {
            Ok(self.response.clone())
        }

        async fn resolve_repository_id(
            &self,
            _id: u64,
            _key: &str,
        ) -> Result<(String, String), FetchError> {
            Err(FetchError::Malformed("not used".to_string()))
        }
    }

    /// Fetch stub that always times out
    struct TimeoutFetch;

    #[async_trait]
    impl FetchClient for TimeoutFetch {
        async fn fetch_repository(
            &self,
            _owner: &str,
            _name: &str,
            _key: &str,
        ) -> Result<Value, FetchError> {
            Err(FetchError::Timeout)
        }

        async fn resolve_repository_id(
            &self,
            _id: u64,
            _key: &str,
        ) -> Result<(String, String), FetchError> {
            Err(FetchError::Timeout)
        }
    }

    /// Store wrapper that sleeps past any reasonable write timeout
    struct SlowStore {
        inner: MemoryStore,
        delay: Duration,
    }

    #[async_trait]
    impl ResultStore for SlowStore {
        async fn put(&self, document: &Document) -> StoreResult<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.put(document).await
        }

        async fn get(&self, id: &str) -> StoreResult<Option<Document>> {
            self.inner.get(id).await
        }

        async fn count(&self) -> StoreResult<usize> {
            self.inner.count().await
        }

        async fn delete_all(&self) -> StoreResult<()> {
            self.inner.delete_all().await
        }
    }

    fn test_config() -> CrawlerConfig {
        CrawlerConfig {
            num_concurrent: 2,
            idle_poll_ms: 10,
            checkout_timeout_secs: 5,
            io_timeout_secs: 1,
        }
    }

    fn test_pool() -> Arc<CredentialPool> {
        Arc::new(
            CredentialPool::new(
                vec![Credential {
                    key: "test-key".to_string(),
                    remaining: 100,
                    reset_at: Utc::now() + ChronoDuration::hours(1),
                }],
                Arc::new(StubProbe),
            )
            .unwrap(),
        )
    }

    fn canned_response(remaining: i64) -> Value {
        json!({
            "data": {
                "repository": {
                    "id": base64::Engine::encode(
                        &base64::engine::general_purpose::STANDARD,
                        "010:Repository16834251",
                    ),
                    "name": "implicit",
                    "owner": {"login": "benfred"},
                    "stargazers": {"totalCount": 500},
                    "primaryLanguage": {"name": "Python"}
                },
                "rateLimit": {
                    "remaining": remaining,
                    "resetAt": (Utc::now() + ChronoDuration::hours(1)).to_rfc3339()
                }
            }
        })
    }

    #[tokio::test]
    async fn test_successful_crawl_writes_document_and_reports_quota() {
        let pool = test_pool();
        let queue = Arc::new(MemoryQueue::seeded([
            json!({"owner": "benfred", "name": "implicit"}),
        ]));
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(StubFetch {
            response: canned_response(4999),
        });

        let task = CrawlTask::new(
            pool.clone(),
            queue.clone(),
            store.clone(),
            client,
            &test_config(),
        );
        task.run().await;

        assert_eq!(store.count().await.unwrap(), 1);
        assert!(queue.is_empty().await.unwrap());

        // Quota reconciled from the response: min(4999, local) never exceeds
        // the reported value
        let cred = &pool.snapshot().await[0];
        assert!(cred.remaining <= 4999);
    }

    #[tokio::test]
    async fn test_store_timeout_requeues_original_message() {
        let pool = test_pool();
        let original = json!({"owner": "benfred", "name": "implicit"});
        let queue = Arc::new(MemoryQueue::seeded([original.clone()]));
        let store = Arc::new(SlowStore {
            inner: MemoryStore::new(),
            delay: Duration::from_secs(5),
        });
        let client = Arc::new(StubFetch {
            response: canned_response(4999),
        });

        let task = CrawlTask::new(pool, queue.clone(), store.clone(), client, &test_config());
        task.run().await;

        // Exactly one copy of the literal message is back on the queue
        assert_eq!(queue.len().await.unwrap(), 1);
        assert_eq!(queue.get().await.unwrap(), Some(original));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fetch_timeout_requeues() {
        let pool = test_pool();
        let original = json!({"owner": "benfred", "name": "implicit"});
        let queue = Arc::new(MemoryQueue::seeded([original.clone()]));
        let store = Arc::new(MemoryStore::new());

        let task = CrawlTask::new(
            pool,
            queue.clone(),
            store.clone(),
            Arc::new(TimeoutFetch),
            &test_config(),
        );
        task.run().await;

        assert_eq!(queue.get().await.unwrap(), Some(original));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_response_is_dropped_not_retried() {
        let pool = test_pool();
        let queue = Arc::new(MemoryQueue::seeded([
            json!({"owner": "benfred", "name": "implicit"}),
        ]));
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(StubFetch {
            response: json!({"data": {"repository": null}}),
        });

        let task = CrawlTask::new(pool, queue.clone(), store.clone(), client, &test_config());
        task.run().await;

        // Consumed, never requeued, nothing written
        assert!(queue.is_empty().await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unrecognized_shape_is_dropped() {
        let pool = test_pool();
        let queue = Arc::new(MemoryQueue::seeded([json!({"surprise": true})]));
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(StubFetch {
            response: canned_response(4999),
        });

        let task = CrawlTask::new(pool, queue.clone(), store.clone(), client, &test_config());
        task.run().await;

        assert!(queue.is_empty().await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_rate_limit_block_is_success_without_update() {
        let pool = test_pool();
        let mut response = canned_response(4999);
        response["data"]
            .as_object_mut()
            .unwrap()
            .remove("rateLimit");

        let queue = Arc::new(MemoryQueue::seeded([
            json!({"owner": "benfred", "name": "implicit"}),
        ]));
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(StubFetch { response });

        let task = CrawlTask::new(
            pool.clone(),
            queue.clone(),
            store.clone(),
            client,
            &test_config(),
        );
        task.run().await;

        assert_eq!(store.count().await.unwrap(), 1);
        assert!(queue.is_empty().await.unwrap());
        // Only the checkout decrement touched the quota
        assert_eq!(pool.snapshot().await[0].remaining, 99);
    }
}
