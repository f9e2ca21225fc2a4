// src/ingest/normalize.rs
//! Item normalizer: turns one raw feed entry plus its source metadata into a
//! [`NewsItem`]. Text cleaning and image lookup sit behind small traits so the
//! regex strategies here can be swapped for a real HTML parser later.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;
use url::Url;

use crate::ingest::types::{NewsItem, RawFeedItem, SourceConfig};

pub const DEFAULT_TEXT_MAX_CHARS: usize = 260;
pub const DEFAULT_FULL_TEXT_MAX_CHARS: usize = 1000;
pub const DEFAULT_FULL_TEXT_SENTENCES: usize = 4;
pub const DEFAULT_PLACEHOLDER: &str =
    "https://images.unsplash.com/photo-1461896836934-ffe607ba8211?w=600";

const ID_HASH_BYTES: usize = 8;

pub trait TextCleaner: Send + Sync {
    /// Plain text of `raw`, at most `max_chars` characters. Never fails.
    fn clean(&self, raw: &str, max_chars: usize) -> String;
}

pub trait ImageExtractor: Send + Sync {
    /// First absolute image URL the item carries, if any.
    fn extract_image(&self, item: &RawFeedItem) -> Option<String>;
}

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn re_img_src() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"(?i)<img\b[^>]*?\ssrc\s*=\s*["']([^"']+)["']"#).unwrap())
}

fn re_bare_image() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)https?://[^\s'"<>()]+\.(?:jpe?g|png|gif|webp)\b(?:\?[^\s'"<>()]*)?"#)
            .unwrap()
    })
}

/// Regex based cleaner: entity decode, tag strip, whitespace collapse, hard cut.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexTextCleaner;

impl RegexTextCleaner {
    fn pass(s: &str) -> String {
        let decoded = html_escape::decode_html_entities(s);
        let stripped = re_tags().replace_all(&decoded, "");
        let collapsed = re_ws().replace_all(&stripped, " ");
        collapsed.trim().to_string()
    }
}

impl TextCleaner for RegexTextCleaner {
    fn clean(&self, raw: &str, max_chars: usize) -> String {
        // Repeat until stable so `&lt;b&gt;` style markup is removed too.
        let mut out = Self::pass(raw);
        loop {
            let next = Self::pass(&out);
            if next == out {
                break;
            }
            out = next;
        }

        if out.chars().count() > max_chars {
            let cut: String = out.chars().take(max_chars).collect();
            out = cut.trim_end().to_string();
        }
        out
    }
}

/// Clean with the default length cap.
pub fn clean(text: &str) -> String {
    clean_to(text, DEFAULT_TEXT_MAX_CHARS)
}

pub fn clean_to(text: &str, max_chars: usize) -> String {
    RegexTextCleaner.clean(text, max_chars)
}

/// Stable 16-char hex id of an identifying string.
pub fn hash_id(key: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(key.trim().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(ID_HASH_BYTES * 2);
    for b in digest.iter().take(ID_HASH_BYTES) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Time + randomness; 17 chars so it never equals a [`hash_id`].
fn fallback_id() -> String {
    let ms = Utc::now().timestamp_millis().max(0) as u64;
    let salt = rand::random::<u32>() & 0x00ff_ffff;
    format!("{ms:x}{salt:06x}")
}

/// Id from link, else guid, else title. Items with none of them get a unique id.
pub fn derive_id(item: &RawFeedItem) -> String {
    match item.identity_key() {
        Some(key) => hash_id(key),
        None => {
            tracing::debug!(target: "ingest", "item has no link/guid/title, using fallback id");
            fallback_id()
        }
    }
}

/// First `n` sentences, split on ". ".
pub fn first_sentences(text: &str, n: usize) -> String {
    text.split(". ").take(n).collect::<Vec<_>>().join(". ")
}

/// Uncleaned full text: content, then summary, then snippet, cut to `sentences`.
pub fn extract_full_text(item: &RawFeedItem, sentences: usize) -> String {
    first_sentences(item.rich_text().unwrap_or_default(), sentences)
}

fn absolutize(candidate: &str, base: Option<&str>) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }
    if let Ok(u) = Url::parse(candidate) {
        return matches!(u.scheme(), "http" | "https").then(|| candidate.to_string());
    }
    match base.and_then(|b| Url::parse(b).ok()) {
        Some(b) => b.join(candidate).ok().map(|u| u.to_string()),
        None => candidate
            .starts_with("//")
            .then(|| format!("https:{candidate}")),
    }
}

/// Enclosure, media fields, `<img src>`, then any bare image URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexImageExtractor;

impl ImageExtractor for RegexImageExtractor {
    fn extract_image(&self, item: &RawFeedItem) -> Option<String> {
        let base = item.link();

        let explicit = item
            .enclosure
            .as_ref()
            .filter(|e| e.is_image())
            .map(|e| e.url.as_str())
            .into_iter()
            .chain(item.media_content_url.as_deref())
            .chain(item.media_thumbnail_url.as_deref());
        for candidate in explicit {
            if let Some(u) = absolutize(candidate, base) {
                return Some(u);
            }
        }

        for html in item.html_fragments() {
            for cap in re_img_src().captures_iter(html) {
                let src = html_escape::decode_html_entities(&cap[1]).to_string();
                if let Some(u) = absolutize(&src, base) {
                    return Some(u);
                }
            }
        }

        item.html_fragments()
            .find_map(|html| re_bare_image().find(html))
            .map(|m| html_escape::decode_html_entities(m.as_str()).to_string())
    }
}

pub fn extract_image(item: &RawFeedItem) -> Option<String> {
    RegexImageExtractor.extract_image(item)
}

/// RFC 2822 (RSS) or RFC 3339 (Atom) timestamp to UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    let parsed = OffsetDateTime::parse(s, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
        .ok()
        .and_then(|odt| DateTime::from_timestamp(odt.unix_timestamp(), odt.nanosecond()));
    // chrono is more lenient with obsolete zone names ("GMT", "EST")
    parsed.or_else(|| {
        DateTime::parse_from_rfc2822(s)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    })
}

pub fn parse_published(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    raw.and_then(parse_timestamp).unwrap_or(now)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub text_max_chars: usize,
    pub full_text_max_chars: usize,
    pub full_text_sentences: usize,
    pub default_placeholder: String,
    /// category -> placeholder image URL
    pub placeholders: HashMap<String, String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            text_max_chars: DEFAULT_TEXT_MAX_CHARS,
            full_text_max_chars: DEFAULT_FULL_TEXT_MAX_CHARS,
            full_text_sentences: DEFAULT_FULL_TEXT_SENTENCES,
            default_placeholder: DEFAULT_PLACEHOLDER.to_string(),
            placeholders: HashMap::new(),
        }
    }
}

impl NormalizeOptions {
    pub fn placeholder_for(&self, category: &str) -> &str {
        self.placeholders
            .get(category)
            .or_else(|| self.placeholders.get(&category.to_ascii_lowercase()))
            .map(String::as_str)
            .unwrap_or(&self.default_placeholder)
    }
}

pub struct Normalizer<C = RegexTextCleaner, I = RegexImageExtractor> {
    opts: NormalizeOptions,
    cleaner: C,
    images: I,
}

impl Normalizer {
    pub fn new(opts: NormalizeOptions) -> Self {
        Self::with_strategies(opts, RegexTextCleaner, RegexImageExtractor)
    }
}

impl<C: TextCleaner, I: ImageExtractor> Normalizer<C, I> {
    pub fn with_strategies(opts: NormalizeOptions, cleaner: C, images: I) -> Self {
        Self {
            opts,
            cleaner,
            images,
        }
    }

    pub fn normalize(&self, raw: &RawFeedItem, src: &SourceConfig) -> NewsItem {
        self.normalize_at(raw, src, Utc::now())
    }

    /// Same as [`Normalizer::normalize`] with an explicit "now" for undated items.
    pub fn normalize_at(&self, raw: &RawFeedItem, src: &SourceConfig, now: DateTime<Utc>) -> NewsItem {
        let o = &self.opts;
        let full_raw = extract_full_text(raw, o.full_text_sentences);

        NewsItem {
            id: derive_id(raw),
            title: self
                .cleaner
                .clean(raw.title().unwrap_or_default(), o.text_max_chars),
            description: self
                .cleaner
                .clean(raw.snippet_text().unwrap_or_default(), o.text_max_chars),
            full_text: self.cleaner.clean(&full_raw, o.full_text_max_chars),
            image: self
                .images
                .extract_image(raw)
                .unwrap_or_else(|| o.placeholder_for(&src.category).to_string()),
            source: src.source.clone(),
            category: src.category.clone(),
            url: raw
                .link()
                .or_else(|| raw.guid().filter(|g| g.starts_with("http")))
                .unwrap_or_default()
                .to_string(),
            time: parse_published(raw.pub_date(), now),
        }
    }
}
