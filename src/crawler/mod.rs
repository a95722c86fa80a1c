//! Crawl orchestration
//!
//! This module contains the two moving parts of the crawler:
//! - The admission loop bounding how many tasks run at once
//! - The per-item task pipeline (credential, fetch, normalize, store, report)
//!
//! Throughput is gated by credential availability, and quota updates are
//! produced by completed tasks, so the scheduler and the credential pool form
//! a feedback loop. The pool's reconciliation rules keep that loop correct
//! under concurrent access.

mod scheduler;
mod task;

pub use scheduler::CrawlScheduler;
pub use task::CrawlTask;

use crate::config::Config;
use crate::credentials::CredentialPool;
use crate::github::GithubClient;
use crate::queue::{MemoryQueue, WorkQueue};
use crate::storage::{JsonlStore, MemoryStore, ResultStore};
use std::path::Path;
use std::sync::Arc;

/// Runs a complete crawl from a loaded configuration
///
/// This is the main entry point for the binary. It will:
/// 1. Build the API client
/// 2. Probe and load the credential pool (fatal if no key is usable)
/// 3. Seed the work queue and open the document store
/// 4. Run the admission loop until the process is terminated
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Err(CrawlError)` - Bootstrap failed; the loop itself never returns
pub async fn crawl(config: Config) -> crate::Result<()> {
    let client = Arc::new(GithubClient::new()?);

    tracing::info!("Probing credentials from: {}", config.credentials.path);
    let pool = Arc::new(
        CredentialPool::load(Path::new(&config.credentials.path), client.clone()).await?,
    );
    tracing::info!(
        "Credential pool ready: {} keys, {} total remaining quota",
        pool.len().await,
        pool.total_remaining().await
    );

    let queue: Arc<dyn WorkQueue> = Arc::new(build_queue(&config).await?);

    let store: Arc<dyn ResultStore> = match config.output.backend.as_str() {
        "memory" => Arc::new(MemoryStore::new()),
        _ => {
            // Validation guarantees the path is present for the jsonl backend
            let path = config.output.path.clone().unwrap_or_default();
            tracing::info!("Writing documents to: {}", path);
            Arc::new(JsonlStore::new(path).await?)
        }
    };

    let scheduler = CrawlScheduler::new(pool, queue, store, client, &config.crawler);
    scheduler.run().await;
    Ok(())
}

/// Creates the in-process queue, seeded from the configured file if any
///
/// The seed file holds one JSON work item per line; unparseable lines are
/// skipped with a warning.
async fn build_queue(config: &Config) -> crate::Result<MemoryQueue> {
    let Some(seed_path) = &config.queue.seed_path else {
        return Ok(MemoryQueue::new());
    };

    let content = tokio::fs::read_to_string(seed_path).await?;

    let mut items = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(value) => items.push(value),
            Err(e) => tracing::warn!("Skipping unparseable seed line: {}", e),
        }
    }

    tracing::info!("Seeded queue with {} work items", items.len());
    Ok(MemoryQueue::seeded(items))
}
