//! Repocrawl main entry point
//!
//! This is the command-line interface for the repocrawl metadata crawler.

use anyhow::Context;
use clap::Parser;
use repocrawl::config::load_config;
use repocrawl::crawler::crawl;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Repocrawl: a quota-aware repository metadata crawler
///
/// Pulls repository identifiers from a work queue, fetches metadata through
/// a pool of rate-limited API keys, and persists normalized documents.
#[derive(Parser, Debug)]
#[command(name = "repocrawl")]
#[command(version)]
#[command(about = "A quota-aware repository metadata crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config).context("failed to load configuration")?;

    crawl(config).await.context("crawl failed")
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("repocrawl=info,warn"),
            1 => EnvFilter::new("repocrawl=debug,info"),
            2 => EnvFilter::new("repocrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
