//! Doc-Harvester main entry point
//!
//! This is the command-line interface for the Doc-Harvester document crawler.

use anyhow::Context;
use clap::Parser;
use doc_harvester::config::{load_config_with_hash, Config};
use doc_harvester::crawler::run_crawl;
use doc_harvester::normalize_url;
use doc_harvester::output::{load_statistics, print_statistics};
use doc_harvester::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Doc-Harvester: a polite breadth-first document crawler
///
/// Doc-Harvester fetches documents from configured seed sources, follows
/// links within each source's domain, honours robots.txt and a per-domain
/// delay, and keeps every document in a SQLite database. Repeated runs
/// refresh stale documents instead of duplicating them.
#[derive(Parser, Debug)]
#[command(name = "doc-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A polite breadth-first document crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the document store and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("doc_harvester=info,warn"),
            1 => EnvFilter::new("doc_harvester=debug,info"),
            2 => EnvFilter::new("doc_harvester=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration and seeds
fn handle_dry_run(config: &Config) {
    let crawler = &config.crawler;

    println!("=== Doc-Harvester Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", crawler.max_depth);
    if crawler.max_pages > 0 {
        println!("  Max pages: {}", crawler.max_pages);
    } else {
        println!("  Max pages: unlimited");
    }
    println!(
        "  Delay between requests: {}ms (floor {}ms)",
        crawler.delay_between_requests, crawler.min_delay_floor
    );
    println!("  Recheck interval: {} days", crawler.recheck_interval_days);
    println!(
        "  Attempts: {} (backoff base {}ms, timeout {}s)",
        crawler.max_attempts, crawler.backoff_base, crawler.request_timeout
    );
    println!("  Respect robots.txt: {}", crawler.respect_robots_txt);
    println!("  Restore queue from saved: {}", crawler.restore_queue_from_saved);
    println!("  User agent: {}", crawler.user_agent);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nSources ({}):", config.sources.len());
    for source in &config.sources {
        let state = if source.enabled { "" } else { " [disabled]" };
        match normalize_url(&source.url, None) {
            Ok(url) => println!("  - {}: {}{}", source.name, url, state),
            Err(e) => println!("  - {}: {} (invalid: {}){}", source.name, source.url, e, state),
        }
    }

    if !config.site_policies.is_empty() {
        println!("\nSite Policies ({}):", config.site_policies.len());
        for policy in &config.site_policies {
            let preset = policy.preset.as_deref().unwrap_or("custom");
            println!(
                "  - {} ({}, {} allow, {} deny)",
                policy.domain,
                preset,
                policy.allow.len(),
                policy.deny.len()
            );
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        config.enabled_sources().count()
    );
}

/// Handles the --stats mode: shows statistics from the document store
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let store = SqliteStorage::new(Path::new(&config.storage.database_path))
        .with_context(|| format!("failed to open {}", config.storage.database_path))?;
    let stats = load_statistics(&store).context("failed to read statistics")?;

    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Sources: {} enabled, site policies: {}",
        config.enabled_sources().count(),
        config.site_policies.len()
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing current page");
            let _ = shutdown_tx.send(true);
        }
    });

    let summary = run_crawl(&config, shutdown_rx)
        .await
        .with_context(|| format!("crawl failed using {}", config.storage.database_path))?;

    if summary.interrupted {
        tracing::info!("Crawl stopped early; run again to continue");
    }

    Ok(())
}
