// tests/ingest_filter.rs
use sports_news_digest::ingest::filter::DenyList;
use sports_news_digest::ingest::providers::rss::RssFetcher;
use sports_news_digest::ingest::sink::MemorySink;
use sports_news_digest::ingest::types::RawFeedItem;
use sports_news_digest::{run_once, IngestConfig, SourceConfig};

const FEED: &str = r#"<rss><channel>
<item><title>Derby</title><link>https://f.test/1</link><description>Spartak win the derby</description></item>
<item><title>Policy</title><link>https://f.test/2</link><description>Minister comments on INFLATION and the derby</description></item>
<item><title>Transfer</title><link>https://f.test/3</link><description>New striker signed</description></item>
</channel></rss>"#;

#[test]
fn denied_keyword_is_case_insensitive() {
    let deny = DenyList::new(["inflation"]);
    let hit = RawFeedItem {
        content_snippet: Some("Rising Inflation worries fans".into()),
        ..Default::default()
    };
    let miss = RawFeedItem {
        content_snippet: Some("Cup final tonight".into()),
        ..Default::default()
    };
    assert!(!deny.is_allowed(&hit));
    assert!(deny.is_allowed(&miss));
    assert_eq!(deny.matched("INFLATION"), Some("inflation"));
}

#[tokio::test]
async fn denied_items_never_reach_the_output() {
    let fetcher = RssFetcher::from_fixtures([("https://f.test/rss", FEED)]);
    let mut cfg = IngestConfig::builtin().unwrap();
    cfg.deny_keywords = vec!["inflation".into()];
    cfg.sources = vec![SourceConfig::new("https://f.test/rss", "F", "football")];

    let sink = MemorySink::new();
    let report = run_once(&fetcher, &cfg, &sink).await.unwrap();

    assert_eq!(report.filtered, 1);
    let urls: Vec<_> = sink.last().unwrap().into_iter().map(|i| i.url).collect();
    assert_eq!(urls.len(), 2);
    assert!(!urls.contains(&"https://f.test/2".to_string()));
}

#[tokio::test]
async fn builtin_phrases_match_through_markup_and_nbsp() {
    let feed = r#"<rss><channel>
<item><title>Rate</title><link>https://f.test/a</link><description>Растет курс&nbsp;доллара перед матчем</description></item>
<item><title>Bank</title><link>https://f.test/b</link><description><![CDATA[Ключевая <b>ставка</b> и футбол]]></description></item>
<item><title>Derby</title><link>https://f.test/c</link><description><![CDATA[<p>Спартак&nbsp;выиграл дерби</p>]]></description></item>
</channel></rss>"#;
    let fetcher = RssFetcher::from_fixtures([("https://f.test/rss", feed)]);
    let mut cfg = IngestConfig::builtin().unwrap();
    cfg.sources = vec![SourceConfig::new("https://f.test/rss", "F", "football")];

    let sink = MemorySink::new();
    let report = run_once(&fetcher, &cfg, &sink).await.unwrap();

    assert_eq!(report.filtered, 2);
    let urls: Vec<_> = sink.last().unwrap().into_iter().map(|i| i.url).collect();
    assert_eq!(urls, ["https://f.test/c"]);
}
