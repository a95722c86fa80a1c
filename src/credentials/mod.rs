//! Credential management for rate-limited API access
//!
//! This module owns the pool of API keys the crawler draws from:
//! - Loading keys from a credential file (one secret per line)
//! - Quota-aware round-robin checkout
//! - Skew-tolerant reconciliation of quota reports from completed crawls

mod pool;

pub use pool::CredentialPool;

use crate::github::FetchError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur in the credential pool
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("No usable credentials found in {path}")]
    NoUsableCredentials { path: String },

    #[error("Credential pool cannot be constructed empty")]
    Empty,

    #[error("Failed to read credential file: {0}")]
    Io(#[from] std::io::Error),
}

/// One authoritative quota observation from the remote API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Calls permitted before the reset time
    pub remaining: i64,

    /// Absolute time at which the quota resets to its maximum
    pub reset_at: DateTime<Utc>,
}

/// One API key plus its locally known quota state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// The opaque secret; unique identity within the pool
    pub key: String,

    /// Known remaining quota; -1 until first observed
    pub remaining: i64,

    /// Time after which `remaining` is considered obsolete
    pub reset_at: DateTime<Utc>,
}

impl Credential {
    /// Creates a credential from a key and a fresh quota observation
    pub fn new(key: impl Into<String>, limit: RateLimit) -> Self {
        Self {
            key: key.into(),
            remaining: limit.remaining,
            reset_at: limit.reset_at,
        }
    }
}

/// Source of authoritative quota observations for a single key
///
/// The pool probes every key once at construction and again on every resync
/// after an exhaustion wait. The GitHub client implements this over the
/// rate-limit GraphQL query; tests substitute a stub.
#[async_trait]
pub trait QuotaProbe: Send + Sync {
    /// Fetches the current rate limit for one API key
    async fn probe(&self, key: &str) -> Result<RateLimit, FetchError>;
}
