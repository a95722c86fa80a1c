//! GitHub API access
//!
//! This module contains everything that understands GitHub:
//! - The [`FetchClient`] trait the crawl task calls through
//! - [`GithubClient`], the reqwest-backed implementation (GraphQL + REST)
//! - GraphQL query text
//! - Normalization of raw responses into flat documents

mod client;
mod document;
mod queries;

pub use client::GithubClient;
pub use document::{decode_node_id, extract_rate_limit, normalize_repository, DocumentError};
pub use queries::{GITHUB_GRAPHQL_URL, GITHUB_REPOSITORY_ID_URL, RATE_LIMIT_QUERY, REPOSITORY_QUERY};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while talking to the API
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("API key rejected as bad credentials")]
    BadCredentials,

    #[error("Rate limit exhausted for the current key")]
    RateLimited,

    #[error("Unexpected response status: {0}")]
    Status(u16),

    #[error("Malformed API response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Whether this error is a timeout (retryable by requeueing the item)
    /// rather than a data problem (terminal drop)
    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::Timeout => true,
            FetchError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Http(e)
        }
    }
}

/// Trait for the remote calls the crawler needs
///
/// One implementation talks to GitHub; tests substitute canned responses.
#[async_trait]
pub trait FetchClient: Send + Sync {
    /// Fetches repository metadata plus the current rate-limit snapshot for
    /// `(owner, name)` in a single round trip, returning the raw response
    async fn fetch_repository(
        &self,
        owner: &str,
        name: &str,
        key: &str,
    ) -> Result<Value, FetchError>;

    /// Resolves an opaque numeric repository id to `(name, owner)`
    ///
    /// Optional extension path: signals [`FetchError::RateLimited`] when the
    /// API refuses the lookup for quota reasons, so callers can requeue
    /// without burning further quota on the same key.
    async fn resolve_repository_id(&self, id: u64, key: &str)
        -> Result<(String, String), FetchError>;
}
