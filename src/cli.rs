//! Command-line arguments for the digest binary.
//!
//! Every option can also come from the environment (or a `.env` file).

use clap::Parser;
use std::path::PathBuf;

use crate::ingest::sink::DEFAULT_OUTPUT_PATH;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Feed registry file (TOML or JSON). Falls back to config/feeds.toml, then the built-in list
    #[arg(short, long, env = "FEEDS_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Where to write the JSON array of news items
    #[arg(short, long, env = "NEWS_OUTPUT_PATH", default_value = DEFAULT_OUTPUT_PATH)]
    pub output: PathBuf,

    /// Override the configured maximum number of items written
    #[arg(long, env = "NEWS_MAX_ITEMS")]
    pub max_items: Option<usize>,
}
