//! Reqwest-backed GitHub client
//!
//! One HTTP client serves all three remote calls the crawler needs: the
//! GraphQL repository fetch, the rate-limit probe, and the REST id lookup.
//! Request timeouts are built into the client (10 seconds per call).

use crate::credentials::{QuotaProbe, RateLimit};
use crate::github::queries::{GITHUB_GRAPHQL_URL, GITHUB_REPOSITORY_ID_URL};
use crate::github::{
    extract_rate_limit, FetchClient, FetchError, RATE_LIMIT_QUERY, REPOSITORY_QUERY,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Per-request timeout for every remote call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// GitHub API client implementing [`FetchClient`] and [`QuotaProbe`]
pub struct GithubClient {
    client: Client,
    graphql_url: String,
    repository_id_url: String,
}

impl GithubClient {
    /// Creates a client against the real GitHub endpoints
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_base_urls(GITHUB_GRAPHQL_URL, GITHUB_REPOSITORY_ID_URL)
    }

    /// Creates a client against custom endpoints (tests point this at a mock
    /// server)
    ///
    /// # Arguments
    ///
    /// * `graphql_url` - GraphQL endpoint for repository fetches and probes
    /// * `repository_id_url` - REST base URL for numeric id lookups
    pub fn with_base_urls(
        graphql_url: impl Into<String>,
        repository_id_url: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("repocrawl/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(REQUEST_TIMEOUT)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            graphql_url: graphql_url.into(),
            repository_id_url: repository_id_url.into(),
        })
    }

    /// Posts one GraphQL request and returns the raw JSON response
    async fn graphql(&self, key: &str, body: Value) -> Result<Value, FetchError> {
        let response = self
            .client
            .post(&self.graphql_url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(FetchError::BadCredentials);
            }
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl FetchClient for GithubClient {
    async fn fetch_repository(
        &self,
        owner: &str,
        name: &str,
        key: &str,
    ) -> Result<Value, FetchError> {
        let body = json!({
            "query": REPOSITORY_QUERY,
            "variables": {
                "owner": owner,
                "name": name,
            },
        });
        self.graphql(key, body).await
    }

    async fn resolve_repository_id(
        &self,
        id: u64,
        key: &str,
    ) -> Result<(String, String), FetchError> {
        let url = format!("{}{}", self.repository_id_url, id);
        let response = self.client.get(&url).bearer_auth(key).send().await?;

        let status = response.status();
        let content: Value = response.json().await?;

        if status == reqwest::StatusCode::FORBIDDEN {
            let message = content
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_lowercase();
            if message.contains("api rate limit") {
                return Err(FetchError::RateLimited);
            }
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let owner = content
            .get("owner")
            .and_then(|o| o.get("login"))
            .and_then(Value::as_str)
            .ok_or_else(|| FetchError::Malformed(format!("no owner login for id {}", id)))?
            .to_string();
        let name = content
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        Ok((name, owner))
    }
}

#[async_trait]
impl QuotaProbe for GithubClient {
    async fn probe(&self, key: &str) -> Result<RateLimit, FetchError> {
        let body = json!({"query": RATE_LIMIT_QUERY});
        let response = self.graphql(key, body).await?;
        extract_rate_limit(&response)
            .map_err(|e| FetchError::Malformed(format!("rate limit probe: {}", e)))
    }
}
