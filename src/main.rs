//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest paginated harvester.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use sumi_harvest::config::{load_config_with_hash, validate, FetchStrategy, HarvestConfig};
use sumi_harvest::output::{load_statistics, print_statistics, write_csv_file};
use sumi_harvest::Coordinator;
use tracing_subscriber::EnvFilter;

/// File written when neither `--output` nor `csv-path` is given
const DEFAULT_CSV_PATH: &str = "scraped_data.csv";

/// Sumi-Harvest: A polite paginated content harvester
///
/// Sumi-Harvest fetches a page (optionally rendering it in a headless
/// browser), honors a robots.txt blanket disallow, stops on captcha pages,
/// extracts records and follows "next" links up to a page bound.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite paginated content harvester", long_about = None)]
struct Cli {
    /// Seed URL (overrides seed-url from the config file)
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of pages to fetch (1-100)
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Delay between page fetches in milliseconds
    #[arg(long, value_name = "N")]
    delay_ms: Option<u64>,

    /// CSS selector for the elements to extract
    #[arg(long, value_name = "CSS")]
    selector: Option<String>,

    /// Use plain HTTP instead of a headless browser
    #[arg(long = "static")]
    static_fetch: bool,

    /// Show the browser window when rendering
    #[arg(long)]
    headed: bool,

    /// Only process the seed page
    #[arg(long)]
    no_pagination: bool,

    /// User agent for robots.txt matching and all requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// CSV file to write the results to
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Only check robots.txt and the seed page for a challenge
    #[arg(long, conflicts_with = "dry_run")]
    check_only: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "check_only")]
    dry_run: bool,

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

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config, &cli);
        return Ok(());
    }

    handle_crawl(config, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
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

/// Loads the config file (if any) and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<HarvestConfig> {
    let mut config = match (&cli.config, &cli.url) {
        (Some(path), _) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        (None, Some(url)) => HarvestConfig::from_seed(url.as_str()),
        (None, None) => bail!("Either a URL or --config must be given"),
    };

    if let Some(url) = &cli.url {
        config.crawl.seed_url = url.clone();
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawl.max_pages = max_pages;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.crawl.delay_ms = delay_ms;
    }
    if let Some(selector) = &cli.selector {
        config.crawl.selector = Some(selector.clone());
    }
    if cli.no_pagination {
        config.crawl.follow_pagination = false;
    }
    if cli.static_fetch {
        config.fetch.strategy = FetchStrategy::Static;
    }
    if cli.headed {
        config.fetch.headless = false;
    }
    if let Some(user_agent) = &cli.user_agent {
        config.fetch.user_agent = user_agent.clone();
    }
    if let Some(output) = &cli.output {
        config.output.csv_path = Some(output.display().to_string());
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &HarvestConfig, cli: &Cli) {
    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Crawl:");
    println!("  Seed URL: {}", config.crawl.seed_url);
    println!("  Max pages: {}", config.crawl.max_pages);
    println!("  Delay: {}ms", config.crawl.delay_ms);
    println!("  Follow pagination: {}", config.crawl.follow_pagination);
    println!("  Selector: {}", config.selector().unwrap_or("(automatic)"));

    println!("\nFetch:");
    println!(
        "  Strategy: {}",
        match config.fetch.strategy {
            FetchStrategy::Static => "static",
            FetchStrategy::Rendered => "rendered",
        }
    );
    println!("  User agent: {}", config.fetch.user_agent);
    println!("  Headless: {}", config.fetch.headless);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  Render wait: {:?}", config.fetch.render_wait);
    for (name, value) in &config.fetch.headers {
        println!("  Header {}: {}", name, value);
    }

    println!("\nOutput:");
    println!("  CSV: {}", csv_path(config, cli).display());

    println!("\n✓ Configuration is valid");
}

fn csv_path(config: &HarvestConfig, cli: &Cli) -> PathBuf {
    cli.output
        .clone()
        .or_else(|| config.output.csv_path.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_PATH))
}

/// Handles the main crawl operation
async fn handle_crawl(config: HarvestConfig, cli: &Cli) -> anyhow::Result<()> {
    let output_path = csv_path(&config, cli);
    let mut coordinator = Coordinator::new(config).context("Failed to set up crawler")?;

    let preflight = coordinator
        .preflight()
        .await
        .context("Failed to fetch the seed page")?;

    if !preflight.policy.allowed {
        tracing::error!("Crawl blocked by robots.txt: {}", preflight.policy.reason);
        bail!("Crawl blocked by robots.txt: {}", preflight.policy.reason);
    }
    tracing::info!("robots.txt: {}", preflight.policy.reason);

    if let Some(error) = &preflight.fetch_error {
        tracing::warn!("Seed page could not be rendered: {}", error);
    }

    if preflight.challenge_detected {
        bail!(
            "Anti-bot challenge detected on {}, not crawling",
            coordinator.seed()
        );
    }

    if cli.check_only {
        println!("✓ {} may be crawled ({})", coordinator.seed(), preflight.policy.reason);
        return Ok(());
    }

    let result = match coordinator.run().await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    let stats = load_statistics(&result);
    if !cli.quiet {
        print_statistics(&stats);
    }

    if result.data.is_empty() {
        tracing::warn!("No records extracted, nothing written");
        return Ok(());
    }

    let table = result.data.to_export_table();
    write_csv_file(&table, &output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    println!("✓ {} rows written to: {}", table.row_count(), output_path.display());

    Ok(())
}
