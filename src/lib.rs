//! Repocrawl: a quota-aware repository metadata crawler
//!
//! This crate implements a crawler that pulls repository identifiers from a
//! work queue, fetches metadata from the GitHub GraphQL API through a pool of
//! rate-limited credentials, and persists normalized documents to a store.

pub mod config;
pub mod crawler;
pub mod credentials;
pub mod github;
pub mod queue;
pub mod storage;

use thiserror::Error;

/// Main error type for repocrawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Credential pool error: {0}")]
    Pool(#[from] credentials::PoolError),

    #[error("Queue error: {0}")]
    Queue(#[from] queue::QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StoreError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] github::FetchError),

    #[error("Document error: {0}")]
    Document(#[from] github::DocumentError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for repocrawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlScheduler, CrawlTask};
pub use credentials::{Credential, CredentialPool, QuotaProbe, RateLimit};
pub use github::{FetchClient, GithubClient};
pub use queue::{MemoryQueue, WorkItem, WorkQueue};
pub use storage::{Document, JsonlStore, MemoryStore, ResultStore};
