// tests/metrics_ingest.rs
use metrics_exporter_prometheus::PrometheusBuilder;
use sports_news_digest::ingest::providers::rss::RssFetcher;
use sports_news_digest::ingest::sink::MemorySink;
use sports_news_digest::{run_once, IngestConfig, SourceConfig};

#[tokio::test]
async fn metrics_exposed_after_ingest() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("recorder");

    let fetcher = RssFetcher::from_fixtures([
        ("https://feed.test/ok", include_str!("fixtures/sports_rss.xml")),
    ]);
    let mut cfg = IngestConfig::builtin().unwrap();
    cfg.sources = vec![
        SourceConfig::new("https://feed.test/ok", "Sports.ru", "football"),
        SourceConfig::new("https://feed.test/down", "Down", "football"),
    ];
    let report = run_once(&fetcher, &cfg, &MemorySink::new()).await.unwrap();
    assert_eq!(report.failed_sources.len(), 1);

    let out = handle.render();
    assert!(out.contains("ingest_items_total"));
    assert!(out.contains("ingest_kept_total"));
    assert!(out.contains("ingest_filtered_total"));
    assert!(out.contains("ingest_provider_errors_total"));
    assert!(out.contains("ingest_parse_ms"));
}
