//! # Mannarella News
//!
//! Scrapes the latest news published by Italian interprofessional funds,
//! national institutions and regional portals, normalizes them into a common
//! record shape, and saves them either to a JSON file or to a MySQL table.
//!
//! ## Usage
//!
//! ```sh
//! mannarella_news json -o public/news.json
//! mannarella_news db
//! ```
//!
//! ## Architecture
//!
//! The application follows a sequential pipeline:
//! 1. **Registry**: The ordered list of sources (built-in or `--sources` YAML)
//! 2. **Fetching**: One GET per source with a fixed user-agent and timeout
//! 3. **Extraction**: Up to three items per source via CSS selectors
//! 4. **Output**: A JSON array, or deduplicated inserts into the `news` table
//!
//! A failing source never stops the run. In `db` mode the database
//! connection is opened before scraping and a connection failure exits
//! non-zero.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod models;
mod outputs;
mod scrapers;
mod sources;
mod utils;

use cli::{Cli, Command, DbArgs};
use models::SourceDescriptor;
use outputs::database::{DbConfig, DbSink};
use outputs::json::write_news_json;
use scrapers::extract::ExtractMode;
use scrapers::fetch::HttpFetcher;
use scrapers::{scrape_all, ScrapeOptions};
use sources::{default_sources, load_sources};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let dotenv = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("Starting news scraper");
    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) => debug!(error = %e, "No .env loaded"),
    }

    let args = Cli::parse();
    debug!(?args.sources, args.max_per_source, args.timeout_secs, "Parsed CLI arguments");

    let sources = match &args.sources {
        Some(path) => load_sources(path).inspect_err(|e| error!(error = %e, "Cannot load source registry"))?,
        None => default_sources(),
    };
    let fetcher = HttpFetcher::new(&args.user_agent, Duration::from_secs(args.timeout_secs))?;

    match args.command.unwrap_or_default() {
        Command::Json { output } => {
            let options = ScrapeOptions {
                max_per_source: args.max_per_source,
                mode: ExtractMode::Json,
            };
            run_json(&fetcher, &sources, &options, &output).await;
        }
        Command::Db(db_args) => {
            let options = ScrapeOptions {
                max_per_source: args.max_per_source,
                mode: ExtractMode::Database,
            };
            run_db(&fetcher, &sources, &options, db_args).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), millis = elapsed.subsec_millis(), "Execution complete");
    Ok(())
}

/// Scrape every source and write the result to `output`.
#[instrument(level = "info", skip_all, fields(output = %output.display()))]
async fn run_json(fetcher: &HttpFetcher, sources: &[SourceDescriptor], options: &ScrapeOptions, output: &Path) {
    let report = scrape_all(fetcher, sources, options).await;
    let total_scraped = report.total_scraped();
    let saved = write_news_json(report.items, output).await;
    info!(total_scraped, saved, "Scraper completed");
}

/// Connect to the database, scrape every source, and insert new items.
///
/// # Errors
///
/// Returns an error only if the initial connection fails; no source is
/// fetched in that case.
#[instrument(level = "info", skip_all)]
async fn run_db(
    fetcher: &HttpFetcher,
    sources: &[SourceDescriptor],
    options: &ScrapeOptions,
    db_args: DbArgs,
) -> Result<(), Box<dyn Error>> {
    let config = DbConfig::from(db_args);
    let sink = match DbSink::connect(&config).await {
        Ok(sink) => sink,
        Err(e) => {
            error!(?config, error = %e, "Database connection failed");
            return Err(e.into());
        }
    };

    let report = scrape_all(fetcher, sources, options).await;
    let saved = sink.save(&report.items).await;
    sink.close().await;

    info!(
        total_scraped = report.total_scraped(),
        saved = saved.inserted,
        skipped = saved.skipped,
        "Scraper completed"
    );
    Ok(())
}
