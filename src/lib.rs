// src/lib.rs
//! Sports/esports news digest: fetch a fixed list of RSS/Atom feeds, normalize
//! every entry into a flat [`NewsItem`], drop off-topic items, deduplicate,
//! rank newest first and write a capped JSON array.

pub mod cli;
pub mod ingest;

pub use crate::ingest::config::{load_config_default, load_config_from, IngestConfig};
pub use crate::ingest::types::{FeedFetcher, NewsItem, RawFeedItem, SourceConfig};
pub use crate::ingest::{run_once, IngestReport};
