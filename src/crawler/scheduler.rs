//! Admission loop keeping up to N crawl tasks in flight
//!
//! The scheduler cycles between three situations: queue empty (sleep a short
//! poll interval), capacity free (spawn exactly one task), and saturated
//! (wait for the first completion). It runs until the process dies; there is
//! no graceful-stop operation. Queue transport errors are absorbed and
//! treated as an empty queue so the loop can never fall over.

use crate::config::CrawlerConfig;
use crate::crawler::CrawlTask;
use crate::credentials::CredentialPool;
use crate::github::FetchClient;
use crate::queue::WorkQueue;
use crate::storage::ResultStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Bounded-concurrency crawl scheduler
///
/// Dequeue order follows the queue's FIFO order; completion order is
/// unordered, so store writes and quota reports are not ordered relative to
/// admission.
pub struct CrawlScheduler {
    task: CrawlTask,
    queue: Arc<dyn WorkQueue>,
    num_concurrent: usize,
    idle_poll: Duration,
}

impl CrawlScheduler {
    /// Creates a scheduler wiring the crawler's collaborators together
    ///
    /// # Arguments
    ///
    /// * `pool` - Credential pool gating task throughput
    /// * `queue` - FIFO source of work items (also the requeue sink)
    /// * `store` - Document sink
    /// * `client` - Remote fetch client
    /// * `config` - Concurrency bound, poll interval, and task timeouts
    pub fn new(
        pool: Arc<CredentialPool>,
        queue: Arc<dyn WorkQueue>,
        store: Arc<dyn ResultStore>,
        client: Arc<dyn FetchClient>,
        config: &CrawlerConfig,
    ) -> Self {
        Self {
            task: CrawlTask::new(pool, queue.clone(), store, client, config),
            queue,
            num_concurrent: config.num_concurrent as usize,
            idle_poll: config.idle_poll(),
        }
    }

    /// Runs the admission loop forever
    ///
    /// At most `num_concurrent` tasks are concurrently active; when
    /// saturated, admission resumes as soon as any one task completes.
    pub async fn run(self) {
        tracing::info!(
            "Scheduler running with {} concurrent tasks",
            self.num_concurrent
        );

        let mut tasks: JoinSet<()> = JoinSet::new();
        loop {
            // Reap whatever has already finished without blocking
            while let Some(result) = tasks.try_join_next() {
                if let Err(e) = result {
                    tracing::warn!("Crawl task panicked: {}", e);
                }
            }

            let empty = match self.queue.is_empty().await {
                Ok(empty) => empty,
                Err(e) => {
                    tracing::warn!("Queue poll failed, treating as empty: {}", e);
                    true
                }
            };
            if empty {
                tokio::time::sleep(self.idle_poll).await;
                continue;
            }

            if tasks.len() >= self.num_concurrent {
                // Saturated: wait for the first completion, then re-evaluate
                if let Some(Err(e)) = tasks.join_next().await {
                    tracing::warn!("Crawl task panicked: {}", e);
                }
                continue;
            }

            let task = self.task.clone();
            tasks.spawn(async move { task.run().await });
        }
    }
}
