//! Resume-Trawler main entry point
//!
//! This is the command-line interface for the Resume-Trawler résumé crawler.

use clap::Parser;
use resume_trawler::config::{load_config_with_hash, Config};
use resume_trawler::crawler::{Coordinator, HttpFetcher, ProxyManager};
use resume_trawler::output::{print_preview, print_store_statistics, print_summary};
use resume_trawler::storage::{open_store, CandidateStore};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Exit code for a run halted by a block or a dead identity
const EXIT_CRITICAL_STOP: u8 = 2;

/// Resume-Trawler: a resilient résumé crawler
///
/// Walks search-result pages, fetches every candidate not already stored and
/// appends the results to a JSONL file. Stops at the first sign of a block.
#[derive(Parser, Debug)]
#[command(name = "resume-trawler")]
#[command(version = "1.0.0")]
#[command(about = "A resilient résumé crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// First search-results page to crawl
    #[arg(long, value_name = "URL", required_unless_present = "stats")]
    start_url: Option<String>,

    /// Maximum number of result pages (overrides the config file)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pages: Option<u32>,

    /// Output JSONL file (overrides the config file)
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Walk result pages only and list the candidates found
    #[arg(long, conflicts_with = "stats")]
    preview: bool,

    /// Show record counts from the output file and exit
    #[arg(long, conflicts_with = "preview")]
    stats: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(pages) = cli.pages {
        config.crawler.max_pages = pages;
    }
    if let Some(out) = &cli.out {
        config.output.path = out.display().to_string();
    }

    if cli.stats {
        handle_stats(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(start_url) = cli.start_url.as_deref() else {
        return Err("--start-url is required".into());
    };

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    handle_crawl(config, start_url, cli.preview, cancel).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("resume_trawler=info,warn"),
            1 => EnvFilter::new("resume_trawler=debug,info"),
            2 => EnvFilter::new("resume_trawler=trace,debug"),
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

/// Cancels the crawl on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, finishing current step");
                cancel.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}

/// Handles the --stats mode: replays the output file and shows record counts
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(&config.output.path);
    println!("Store: {}\n", path.display());

    if !path.exists() {
        println!("No records yet");
        return Ok(());
    }

    let store = open_store(path)?;
    print_store_statistics(store.load_report());

    Ok(())
}

/// Handles the preview and full crawl modes
async fn handle_crawl(
    config: Config,
    start_url: &str,
    preview: bool,
    cancel: CancellationToken,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let proxies = Arc::new(ProxyManager::new(config.proxy.proxies.clone()));
    if proxies.is_direct() {
        tracing::info!("No proxies configured, connecting directly");
    } else {
        tracing::info!("Using {} proxies", proxies.len());
    }

    let fetcher = HttpFetcher::from_config(&config, proxies)?;
    let store = open_store(Path::new(&config.output.path))?;
    tracing::info!("{} records already stored", store.len());

    let mut coordinator =
        Coordinator::new(config.crawler.clone(), fetcher, store)?.with_cancellation(cancel);

    let stats = if preview {
        let result = coordinator.preview(start_url).await?;
        print_preview(&result);
        coordinator.stats().clone()
    } else {
        let stats = coordinator.run(start_url).await?;
        print_summary(&stats);
        stats
    };

    let quarantined = coordinator.fetcher().proxies().quarantined_count();
    if quarantined > 0 {
        tracing::warn!("{} proxies quarantined during this run", quarantined);
    }

    if stats.critical_stop {
        if preview {
            if let Some(reason) = &stats.stop_reason {
                println!("\nCRITICAL STOP: {}", reason);
            }
        }
        return Ok(ExitCode::from(EXIT_CRITICAL_STOP));
    }

    Ok(ExitCode::SUCCESS)
}
