// src/ingest/mod.rs
pub mod config;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod providers;
pub mod rank;
pub mod sink;
pub mod types;

use crate::ingest::config::IngestConfig;
use crate::ingest::error::{FetchError, SinkError};
use crate::ingest::filter::DenyList;
use crate::ingest::normalize::{ImageExtractor, Normalizer, TextCleaner};
use crate::ingest::sink::NewsSink;
use crate::ingest::types::{FeedFetcher, NewsItem, SourceConfig};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tracing::{error, info, instrument};

/// One-time metrics registration (so series show up once a recorder is installed).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Raw feed items considered.");
        describe_counter!(
            "ingest_kept_total",
            "Items written after dedup, ranking and truncation."
        );
        describe_counter!(
            "ingest_filtered_total",
            "Items rejected by the deny-list."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Items replaced by a later item with the same id."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Feed fetch/parse errors."
        );
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when ingest pipeline last ran."
        );
    });
}

/// Normalized items from one source plus how many the deny-list rejected.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub items: Vec<NewsItem>,
    pub filtered: usize,
}

/// Everything gathered from the registry, before dedup and ranking.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub items: Vec<NewsItem>,
    pub filtered: usize,
    pub failed_sources: Vec<String>,
}

/// Outcome of a full run. `items` is exactly what was handed to the sink.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub items: Vec<NewsItem>,
    pub collected: usize,
    pub filtered: usize,
    pub duplicates: usize,
    pub failed_sources: Vec<String>,
}

/// Fetch one source, keep its first `limit` items, drop denied ones, normalize the rest.
#[instrument(level = "info", skip_all, fields(source = %src.source, url = %src.url))]
pub async fn ingest_source<C, I>(
    fetcher: &dyn FeedFetcher,
    src: &SourceConfig,
    normalizer: &Normalizer<C, I>,
    deny: &DenyList,
    limit: usize,
) -> Result<SourceBatch, FetchError>
where
    C: TextCleaner,
    I: ImageExtractor,
{
    let feed = fetcher.fetch_feed(&src.url).await?;

    let mut batch = SourceBatch::default();
    for raw in feed.items.iter().take(limit) {
        counter!("ingest_items_total").increment(1);
        if !deny.is_allowed(raw) {
            batch.filtered += 1;
            continue;
        }
        batch.items.push(normalizer.normalize(raw, src));
    }
    Ok(batch)
}

/// Append one source's items to the running aggregate.
pub fn aggregate(mut acc: Vec<NewsItem>, batch: Vec<NewsItem>) -> Vec<NewsItem> {
    acc.extend(batch);
    acc
}

/// Walk the registry in order. A failing source is logged and skipped.
pub async fn collect_sources(fetcher: &dyn FeedFetcher, cfg: &IngestConfig) -> Collected {
    let normalizer = Normalizer::new(cfg.normalize_options());
    let deny = cfg.deny_list();

    let mut out = Collected::default();
    for src in &cfg.sources {
        match ingest_source(fetcher, src, &normalizer, &deny, cfg.items_per_source).await {
            Ok(batch) => {
                info!(
                    target: "ingest",
                    source = %src.source,
                    category = %src.category,
                    kept = batch.items.len(),
                    filtered = batch.filtered,
                    "source ingested"
                );
                out.filtered += batch.filtered;
                out.items = aggregate(std::mem::take(&mut out.items), batch.items);
            }
            Err(e) => {
                error!(target: "ingest", error = %e, url = %src.url, source = %src.source, "source failed, skipping");
                counter!("ingest_provider_errors_total").increment(1);
                out.failed_sources.push(src.url.clone());
            }
        }
    }
    out
}

/// Run ingest once: collect every source, dedup (last write wins), rank newest
/// first, cap at `max_items` and hand the result to `sink`.
/// Only a sink failure is returned as an error.
pub async fn run_once(
    fetcher: &dyn FeedFetcher,
    cfg: &IngestConfig,
    sink: &dyn NewsSink,
) -> Result<IngestReport, SinkError> {
    ensure_metrics_described();

    let collected = collect_sources(fetcher, cfg).await;
    let total = collected.items.len();
    let (unique, duplicates) = rank::dedup_last_wins(collected.items);
    let unique_count = unique.len();
    let ranked = rank::rank_and_truncate(unique, cfg.max_items);

    sink.write(&ranked).await?;

    let now = chrono::Utc::now().timestamp().max(0) as u64;
    counter!("ingest_kept_total").increment(ranked.len() as u64);
    counter!("ingest_filtered_total").increment(collected.filtered as u64);
    counter!("ingest_dedup_total").increment(duplicates as u64);
    gauge!("ingest_pipeline_last_run_ts").set(now as f64);

    info!(
        target: "ingest",
        collected = total,
        unique = unique_count,
        written = ranked.len(),
        filtered = collected.filtered,
        failed_sources = collected.failed_sources.len(),
        "Got {} news, saved {}",
        unique_count,
        ranked.len()
    );

    Ok(IngestReport {
        items: ranked,
        collected: total,
        filtered: collected.filtered,
        duplicates,
        failed_sources: collected.failed_sources,
    })
}
