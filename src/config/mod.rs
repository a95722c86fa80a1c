//! Configuration module for repocrawl
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files.
//!
//! # Example
//!
//! ```no_run
//! use repocrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Concurrent tasks: {}", config.crawler.num_concurrent);
//! ```

use crate::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for repocrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub credentials: CredentialsConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of concurrently in-flight crawl tasks
    #[serde(rename = "num-concurrent", default = "default_num_concurrent")]
    pub num_concurrent: u32,

    /// Sleep interval while the queue is empty (milliseconds)
    #[serde(rename = "idle-poll-ms", default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Upper bound on waiting for a usable credential (seconds)
    #[serde(rename = "checkout-timeout-secs", default = "default_checkout_timeout")]
    pub checkout_timeout_secs: u64,

    /// Upper bound on store writes and quota reports (seconds)
    #[serde(rename = "io-timeout-secs", default = "default_io_timeout")]
    pub io_timeout_secs: u64,
}

/// Credential source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    /// Path to the key file, one API key per line
    pub path: String,
}

/// Output store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Store backend: "jsonl" or "memory"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Path to the JSON-lines document file (jsonl backend only)
    #[serde(default)]
    pub path: Option<String>,
}

/// Work queue configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueConfig {
    /// Optional JSON-lines file of work items to seed the queue with
    #[serde(rename = "seed-path", default)]
    pub seed_path: Option<String>,
}

fn default_num_concurrent() -> u32 {
    100
}

fn default_idle_poll_ms() -> u64 {
    1000
}

fn default_checkout_timeout() -> u64 {
    3600
}

fn default_io_timeout() -> u64 {
    10
}

fn default_backend() -> String {
    "jsonl".to_string()
}

impl CrawlerConfig {
    /// The idle poll interval as a `Duration`
    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    /// The credential checkout timeout as a `Duration`
    pub fn checkout_timeout(&self) -> Duration {
        Duration::from_secs(self.checkout_timeout_secs)
    }

    /// The store-write/quota-report timeout as a `Duration`
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.crawler.num_concurrent < 1 || config.crawler.num_concurrent > 10_000 {
        return Err(ConfigError::Validation(format!(
            "num_concurrent must be between 1 and 10000, got {}",
            config.crawler.num_concurrent
        )));
    }

    if config.crawler.idle_poll_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "idle_poll_ms must be >= 10ms, got {}ms",
            config.crawler.idle_poll_ms
        )));
    }

    if config.crawler.io_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "io_timeout_secs must be >= 1s, got {}s",
            config.crawler.io_timeout_secs
        )));
    }

    if config.credentials.path.is_empty() {
        return Err(ConfigError::Validation(
            "credentials path cannot be empty".to_string(),
        ));
    }

    match config.output.backend.as_str() {
        "memory" => {}
        "jsonl" => {
            if config.output.path.as_deref().unwrap_or("").is_empty() {
                return Err(ConfigError::Validation(
                    "output path is required for the jsonl backend".to_string(),
                ));
            }
        }
        other => {
            return Err(ConfigError::Validation(format!(
                "unknown output backend '{}', expected 'jsonl' or 'memory'",
                other
            )));
        }
    }

    Ok(())
}
