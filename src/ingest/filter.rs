// src/ingest/filter.rs
use crate::ingest::normalize::clean_to;
use crate::ingest::types::RawFeedItem;

/// Off-topic keyword filter. Keywords are matched as lower-cased substrings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DenyList {
    keywords: Vec<String>,
}

impl DenyList {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        keywords.sort();
        keywords.dedup();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// First keyword contained in `text`, if any.
    pub fn matched<'a>(&'a self, text: &str) -> Option<&'a str> {
        if self.keywords.is_empty() {
            return None;
        }
        let lower = text.to_lowercase();
        self.keywords
            .iter()
            .find(|k| lower.contains(k.as_str()))
            .map(String::as_str)
    }

    /// False when the item's snippet/summary mentions a denied keyword.
    /// Markup is stripped and whitespace (including NBSP) collapsed first.
    pub fn is_allowed(&self, item: &RawFeedItem) -> bool {
        match item.snippet_text() {
            Some(text) => self.matched(&clean_to(text, usize::MAX)).is_none(),
            None => true,
        }
    }
}
