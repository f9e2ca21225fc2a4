// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::filter::DenyList;
use crate::ingest::normalize::{
    NormalizeOptions, DEFAULT_FULL_TEXT_MAX_CHARS, DEFAULT_FULL_TEXT_SENTENCES,
    DEFAULT_PLACEHOLDER, DEFAULT_TEXT_MAX_CHARS,
};
use crate::ingest::providers::rss::{FetchOptions, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::ingest::types::SourceConfig;

pub const ENV_PATH: &str = "FEEDS_CONFIG_PATH";

/// Registry shipped with the binary; used when no config file is found.
pub const BUILTIN_CONFIG_TOML: &str = include_str!("../../config/feeds.toml");

pub const DEFAULT_MAX_ITEMS: usize = 120;
pub const DEFAULT_ITEMS_PER_SOURCE: usize = 15;

/// Feed registry, deny-list, placeholder map and limits for one run.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_items_per_source")]
    pub items_per_source: usize,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_text_max_chars")]
    pub text_max_chars: usize,
    #[serde(default = "default_full_text_max_chars")]
    pub full_text_max_chars: usize,
    #[serde(default = "default_full_text_sentences")]
    pub full_text_sentences: usize,
    #[serde(default = "default_placeholder")]
    pub default_placeholder: String,
    #[serde(default)]
    pub placeholders: HashMap<String, String>,
    #[serde(default)]
    pub deny_keywords: Vec<String>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}
fn default_items_per_source() -> usize {
    DEFAULT_ITEMS_PER_SOURCE
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_text_max_chars() -> usize {
    DEFAULT_TEXT_MAX_CHARS
}
fn default_full_text_max_chars() -> usize {
    DEFAULT_FULL_TEXT_MAX_CHARS
}
fn default_full_text_sentences() -> usize {
    DEFAULT_FULL_TEXT_SENTENCES
}
fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

impl IngestConfig {
    pub fn builtin() -> Result<Self> {
        parse_config(BUILTIN_CONFIG_TOML, "toml").context("parsing built-in feed registry")
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            text_max_chars: self.text_max_chars,
            full_text_max_chars: self.full_text_max_chars,
            full_text_sentences: self.full_text_sentences,
            default_placeholder: self.default_placeholder.clone(),
            placeholders: self.placeholders.clone(),
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn deny_list(&self) -> DenyList {
        DenyList::new(&self.deny_keywords)
    }

    fn validate(mut self) -> Result<Self> {
        if self.sources.is_empty() {
            bail!("config lists no feed sources");
        }
        for (i, s) in self.sources.iter_mut().enumerate() {
            s.url = s.url.trim().to_string();
            s.source = s.source.trim().to_string();
            s.category = s.category.trim().to_string();
            if s.url.is_empty() || s.source.is_empty() || s.category.is_empty() {
                bail!("source #{i} needs non-empty url, source and category");
            }
        }
        if self.max_items == 0 {
            bail!("max_items must be at least 1");
        }
        if self.items_per_source == 0 || self.full_text_sentences == 0 {
            bail!("items_per_source and full_text_sentences must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be at least 1");
        }
        self.deny_keywords = clean_list(std::mem::take(&mut self.deny_keywords));
        Ok(self)
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<IngestConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feed config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing feed config {}", path.display()))
}

/// Load config using env var + fallbacks:
/// 1) $FEEDS_CONFIG_PATH
/// 2) config/feeds.toml
/// 3) config/feeds.json
/// 4) built-in registry
pub fn load_config_default() -> Result<IngestConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/feeds.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/feeds.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    IngestConfig::builtin()
}

fn parse_config(s: &str, hint_ext: &str) -> Result<IngestConfig> {
    let cfg = if hint_ext == "json" || s.trim_start().starts_with('{') {
        serde_json::from_str::<IngestConfig>(s).context("invalid JSON feed config")?
    } else {
        toml::from_str::<IngestConfig>(s).context("invalid TOML feed config")?
    };
    cfg.validate()
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() {
            set.insert(t.to_lowercase());
        }
    }
    set.into_iter().collect()
}
