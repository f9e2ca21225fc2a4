// src/ingest/providers/mod.rs
pub mod rss;

pub use rss::{decode_feed_bytes, parse_feed, FetchOptions, RssFetcher};
