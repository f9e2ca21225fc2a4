// src/ingest/types.rs
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::ingest::error::FetchError;

/// One configured feed endpoint plus the display metadata copied onto its items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    pub url: String,
    pub source: String,   // e.g. "Sports.ru"
    pub category: String, // e.g. "football", "dota2"
}

impl SourceConfig {
    pub fn new(url: impl Into<String>, source: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            source: source.into(),
            category: category.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub mime: Option<String>,
}

impl Enclosure {
    /// Enclosures without a MIME type are assumed to be images.
    pub fn is_image(&self) -> bool {
        self.mime
            .as_deref()
            .map(|m| m.trim().to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(true)
    }
}

/// A single entry from a parsed feed. Every field a feed may omit is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub guid: Option<String>,
    pub pub_date: Option<String>,
    /// Rich (usually HTML) body: `content:encoded`, `description` or Atom `content`.
    pub content: Option<String>,
    /// Atom `summary`.
    pub summary: Option<String>,
    /// Short text: RSS `description`.
    pub content_snippet: Option<String>,
    pub enclosure: Option<Enclosure>,
    pub media_content_url: Option<String>,
    pub media_thumbnail_url: Option<String>,
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl RawFeedItem {
    pub fn title(&self) -> Option<&str> {
        non_blank(&self.title)
    }

    pub fn link(&self) -> Option<&str> {
        non_blank(&self.link)
    }

    pub fn guid(&self) -> Option<&str> {
        non_blank(&self.guid)
    }

    pub fn pub_date(&self) -> Option<&str> {
        non_blank(&self.pub_date)
    }

    pub fn content(&self) -> Option<&str> {
        non_blank(&self.content)
    }

    pub fn summary(&self) -> Option<&str> {
        non_blank(&self.summary)
    }

    pub fn content_snippet(&self) -> Option<&str> {
        non_blank(&self.content_snippet)
    }

    /// Text the item is identified by: link, then guid, then title.
    pub fn identity_key(&self) -> Option<&str> {
        self.link().or_else(|| self.guid()).or_else(|| self.title())
    }

    /// Short text used for the description and the deny-list check.
    pub fn snippet_text(&self) -> Option<&str> {
        self.content_snippet().or_else(|| self.summary())
    }

    /// Longest available body, used for the full text.
    pub fn rich_text(&self) -> Option<&str> {
        self.content()
            .or_else(|| self.summary())
            .or_else(|| self.content_snippet())
    }

    /// Embedded HTML fragments worth scanning for images, in priority order.
    pub fn html_fragments(&self) -> impl Iterator<Item = &str> {
        [self.content(), self.content_snippet(), self.summary()]
            .into_iter()
            .flatten()
    }
}

/// A fetched feed: channel title plus its items in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub items: Vec<RawFeedItem>,
}

/// Canonical, display-ready record written to `news.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub full_text: String,
    pub image: String,
    pub source: String,
    pub category: String,
    pub url: String,
    #[serde(with = "iso_millis")]
    pub time: DateTime<Utc>,
}

/// RFC 3339 in UTC with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`.
pub mod iso_millis {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn format(t: &DateTime<Utc>) -> String {
        t.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// Something that can turn a feed URL into parsed items.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch_feed(&self, url: &str) -> Result<ParsedFeed, FetchError>;
}
