// src/ingest/providers/rss.rs
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use crate::ingest::error::FetchError;
use crate::ingest::types::{Enclosure, FeedFetcher, ParsedFeed, RawFeedItem};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; sports-news-digest/0.1)";

// Root element name is not checked, so one shape covers <rss> and Atom <feed>.
// The deserializer matches elements by local name: `media:content` is `content`,
// `content:encoded` is `encoded`, `dc:date` is `date`.
#[derive(Debug, Deserialize)]
struct Document {
    channel: Option<Channel>,
    title: Option<TextNode>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Default, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    guid: Option<TextNode>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    // dc:date
    #[serde(rename = "date")]
    dc_date: Option<String>,
    description: Option<String>,
    // content:encoded
    #[serde(rename = "encoded")]
    content_encoded: Option<String>,
    #[serde(rename = "enclosure", default)]
    enclosures: Vec<EnclosureNode>,
    #[serde(rename = "content", default)]
    media_content: Vec<MediaNode>,
    #[serde(rename = "thumbnail", default)]
    media_thumbnail: Vec<MediaNode>,
    #[serde(rename = "group")]
    media_group: Option<MediaGroup>,
}

#[derive(Debug, Deserialize)]
struct EnclosureNode {
    #[serde(rename = "@url", default)]
    url: String,
    #[serde(rename = "@type")]
    mime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaNode {
    #[serde(rename = "@url", default)]
    url: String,
    #[serde(rename = "@medium")]
    medium: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaGroup {
    #[serde(default)]
    content: Vec<MediaNode>,
    #[serde(default)]
    thumbnail: Vec<MediaNode>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    id: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    content: Option<TextNode>,
    summary: Option<TextNode>,
    #[serde(rename = "group")]
    media_group: Option<MediaGroup>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
    #[serde(rename = "@type")]
    mime: Option<String>,
}

fn first_media_url<'a>(nodes: impl IntoIterator<Item = &'a MediaNode>) -> Option<String> {
    nodes
        .into_iter()
        .filter(|m| !m.url.trim().is_empty())
        .find(|m| {
            m.medium
                .as_deref()
                .map_or(true, |k| k.eq_ignore_ascii_case("image"))
        })
        .map(|m| m.url.trim().to_string())
}

fn text_of(node: Option<TextNode>) -> Option<String> {
    node.map(|t| t.value)
}

impl From<RssItem> for RawFeedItem {
    fn from(it: RssItem) -> Self {
        let group = it.media_group.unwrap_or_default();
        let enclosure = it
            .enclosures
            .iter()
            .filter(|e| !e.url.trim().is_empty())
            .map(|e| Enclosure {
                url: e.url.trim().to_string(),
                mime: e.mime.clone(),
            })
            .reduce(|best, e| if best.is_image() { best } else { e });

        RawFeedItem {
            title: it.title,
            link: it.link,
            guid: text_of(it.guid),
            pub_date: it.pub_date.or(it.dc_date),
            content: it.content_encoded.clone().or_else(|| it.description.clone()),
            summary: None,
            content_snippet: it.description.or(it.content_encoded),
            enclosure,
            media_content_url: first_media_url(it.media_content.iter().chain(&group.content)),
            media_thumbnail_url: first_media_url(
                it.media_thumbnail.iter().chain(&group.thumbnail),
            ),
        }
    }
}

impl From<AtomEntry> for RawFeedItem {
    fn from(e: AtomEntry) -> Self {
        let group = e.media_group.unwrap_or_default();
        let link = e
            .links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .map(|l| l.href.clone());
        let enclosure = e
            .links
            .iter()
            .find(|l| l.rel.as_deref() == Some("enclosure"))
            .map(|l| Enclosure {
                url: l.href.clone(),
                mime: l.mime.clone(),
            });

        RawFeedItem {
            title: text_of(e.title),
            link,
            guid: e.id,
            pub_date: e.published.or(e.updated),
            content: text_of(e.content),
            summary: text_of(e.summary),
            content_snippet: None,
            enclosure,
            media_content_url: first_media_url(&group.content),
            media_thumbnail_url: first_media_url(&group.thumbnail),
        }
    }
}

/// HTML named entities are not valid XML; rewrite the common ones as
/// numeric references before parsing.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", "&#160;")
        .replace("&laquo;", "&#171;")
        .replace("&raquo;", "&#187;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&hellip;", "&#8230;")
        .replace("&ldquo;", "&#8220;")
        .replace("&rdquo;", "&#8221;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rsquo;", "&#8217;")
        .replace("&bdquo;", "&#8222;")
        .replace("&copy;", "&#169;")
}

/// Decode a raw feed body. The encoding comes from the BOM or the
/// `<?xml encoding=...?>` declaration and defaults to UTF-8.
pub fn decode_feed_bytes(bytes: &[u8]) -> Result<String, FetchError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    // The reader switches its decoder once it has seen the declaration.
    loop {
        let done = matches!(
            reader.read_event_into(&mut buf),
            Ok(Event::Decl(_) | Event::Start(_) | Event::Empty(_) | Event::Eof) | Err(_)
        );
        if done {
            break;
        }
        buf.clear();
    }
    let text = reader
        .decoder()
        .decode(bytes)
        .map_err(|e| FetchError::Parse(format!("undecodable feed body: {e}")))?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Parse an RSS 2.0 or Atom document.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed, FetchError> {
    let t0 = std::time::Instant::now();
    let cleaned = scrub_html_entities_for_xml(xml);
    let doc: Document = from_str(&cleaned).map_err(|e| FetchError::Parse(e.to_string()))?;

    let feed = match doc.channel {
        Some(ch) => ParsedFeed {
            title: ch.title,
            items: ch.items.into_iter().map(RawFeedItem::from).collect(),
        },
        None if doc.title.is_some() || !doc.entries.is_empty() => ParsedFeed {
            title: text_of(doc.title),
            items: doc.entries.into_iter().map(RawFeedItem::from).collect(),
        },
        None => {
            return Err(FetchError::Parse(
                "document has neither an RSS channel nor Atom entries".into(),
            ))
        }
    };

    histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(feed)
}

/// Request settings shared by every source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

pub struct RssFetcher {
    mode: Mode,
}

enum Mode {
    // url -> XML body, served without network access
    Fixture(HashMap<String, String>),
    Http { client: reqwest::Client },
}

impl RssFetcher {
    pub fn http(opts: &FetchOptions) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(opts.timeout)
            .user_agent(opts.user_agent.clone())
            .build()?;
        Ok(Self {
            mode: Mode::Http { client },
        })
    }

    pub fn from_fixtures<I, U, X>(fixtures: I) -> Self
    where
        I: IntoIterator<Item = (U, X)>,
        U: Into<String>,
        X: Into<String>,
    {
        let map = fixtures
            .into_iter()
            .map(|(u, x)| (u.into(), x.into()))
            .collect();
        Self {
            mode: Mode::Fixture(map),
        }
    }
}

#[async_trait]
impl FeedFetcher for RssFetcher {
    async fn fetch_feed(&self, url: &str) -> Result<ParsedFeed, FetchError> {
        match &self.mode {
            Mode::Fixture(map) => match map.get(url) {
                Some(xml) => parse_feed(xml),
                None => Err(FetchError::Status {
                    status: 404,
                    url: url.to_string(),
                }),
            },
            Mode::Http { client } => {
                tracing::debug!(target: "ingest", %url, "fetching feed");
                let resp = client.get(url).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                let body = resp.bytes().await?;
                parse_feed(&decode_feed_bytes(&body)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rss_item_fields_are_mapped() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Test&nbsp;feed</title>
    <item>
      <title>Match Result</title>
      <link>http://x/1</link>
      <guid isPermaLink="false">g-1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
      <description><![CDATA[<p>Team A won.</p>]]></description>
      <content:encoded><![CDATA[<p>Team A won. Long story.</p>]]></content:encoded>
      <enclosure url="http://x/a.mp3" type="audio/mpeg" length="1"/>
      <enclosure url="http://x/a.jpg" type="image/jpeg" length="1"/>
      <media:thumbnail url="http://x/t.jpg"/>
    </item>
  </channel>
</rss>"#;
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Test\u{a0}feed"));
        assert_eq!(feed.items.len(), 1);

        let it = &feed.items[0];
        assert_eq!(it.link.as_deref(), Some("http://x/1"));
        assert_eq!(it.guid.as_deref(), Some("g-1"));
        assert_eq!(it.content.as_deref(), Some("<p>Team A won. Long story.</p>"));
        assert_eq!(it.content_snippet.as_deref(), Some("<p>Team A won.</p>"));
        assert_eq!(it.enclosure.as_ref().map(|e| e.url.as_str()), Some("http://x/a.jpg"));
        assert_eq!(it.media_thumbnail_url.as_deref(), Some("http://x/t.jpg"));
        assert_eq!(it.media_content_url, None);
    }

    #[test]
    fn namespaced_elements_are_read() {
        let xml = r#"<rss xmlns:content="http://purl.org/rss/1.0/modules/content/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:media="http://search.yahoo.com/mrss/">
<channel>
  <item>
    <title>A</title>
    <link>https://a.test/1</link>
    <dc:date>2024-03-01T12:00:00Z</dc:date>
    <content:encoded><![CDATA[<p>Body</p><img src="https://a.test/1.jpg">]]></content:encoded>
    <media:group>
      <media:content url="https://a.test/clip.mp4" medium="video"/>
      <media:content url="https://a.test/still.jpg" medium="image"/>
      <media:thumbnail url="https://a.test/thumb.jpg"/>
    </media:group>
  </item>
</channel>
</rss>"#;
        let feed = parse_feed(xml).unwrap();
        let it = &feed.items[0];
        assert_eq!(it.pub_date.as_deref(), Some("2024-03-01T12:00:00Z"));
        assert_eq!(
            it.content.as_deref(),
            Some(r#"<p>Body</p><img src="https://a.test/1.jpg">"#)
        );
        assert_eq!(it.content_snippet, it.content);
        assert_eq!(it.media_content_url.as_deref(), Some("https://a.test/still.jpg"));
        assert_eq!(it.media_thumbnail_url.as_deref(), Some("https://a.test/thumb.jpg"));
    }

    #[test]
    fn body_is_decoded_by_declared_encoding() {
        let mut body =
            br#"<?xml version="1.0" encoding="windows-1251"?><rss><channel><title>"#.to_vec();
        // "Привет" in windows-1251
        body.extend([0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2]);
        body.extend(b"</title></channel></rss>");

        let text = decode_feed_bytes(&body).unwrap();
        let feed = parse_feed(&text).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Привет"));

        let utf8 = "\u{feff}<rss><channel><title>Матч</title></channel></rss>";
        let feed = parse_feed(&decode_feed_bytes(utf8.as_bytes()).unwrap()).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Матч"));
    }

    #[test]
    fn atom_entries_are_mapped() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Esports</title>
  <entry>
    <title type="html">Final &amp;amp; trophy</title>
    <link rel="alternate" href="https://esports.test/final"/>
    <link rel="enclosure" type="image/png" href="https://esports.test/final.png"/>
    <id>urn:uuid:1</id>
    <updated>2024-02-01T10:00:00Z</updated>
    <summary>Grand final recap</summary>
  </entry>
</feed>"#;
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Esports"));
        let it = &feed.items[0];
        assert_eq!(it.title.as_deref(), Some("Final &amp; trophy"));
        assert_eq!(it.link.as_deref(), Some("https://esports.test/final"));
        assert_eq!(it.guid.as_deref(), Some("urn:uuid:1"));
        assert_eq!(it.pub_date.as_deref(), Some("2024-02-01T10:00:00Z"));
        assert_eq!(it.summary.as_deref(), Some("Grand final recap"));
        assert_eq!(
            it.enclosure.as_ref().map(|e| e.url.as_str()),
            Some("https://esports.test/final.png")
        );
    }

    #[test]
    fn non_feed_documents_are_rejected() {
        assert!(matches!(
            parse_feed("<html><body>oops</body></html>"),
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(parse_feed("not xml at all <"), Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn fixture_mode_serves_by_url() {
        let f = RssFetcher::from_fixtures([(
            "https://feed.test/rss",
            "<rss><channel><title>T</title></channel></rss>",
        )]);
        let feed = f.fetch_feed("https://feed.test/rss").await.unwrap();
        assert!(feed.items.is_empty());
        assert!(matches!(
            f.fetch_feed("https://feed.test/missing").await,
            Err(FetchError::Status { status: 404, .. })
        ));
    }
}
