//! Sports News Digest binary entrypoint.
//! One batch run: load the feed registry, ingest every source, write news.json.
//! Exits non-zero only when the config cannot be loaded or the output cannot be written.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sports_news_digest::cli::Cli;
use sports_news_digest::ingest::{
    self, config, providers::rss::RssFetcher, sink::JsonFileSink,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Cli::parse();

    let mut cfg = match &args.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config_default()?,
    };
    if let Some(n) = args.max_items {
        anyhow::ensure!(n > 0, "--max-items must be at least 1");
        cfg.max_items = n;
    }
    info!(
        sources = cfg.sources.len(),
        max_items = cfg.max_items,
        output = %args.output.display(),
        "starting news ingest"
    );

    let fetcher = RssFetcher::http(&cfg.fetch_options()).context("building HTTP client")?;
    let sink = JsonFileSink::new(&args.output);

    let report = ingest::run_once(&fetcher, &cfg, &sink)
        .await
        .context("writing news output")?;

    info!(
        written = report.items.len(),
        failed_sources = report.failed_sources.len(),
        "done"
    );
    Ok(())
}
