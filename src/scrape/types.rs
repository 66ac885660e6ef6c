// src/scrape/types.rs
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an item was scraped from. Serialized lowercase on the wire and in
/// storage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NewsSource {
    News,
    Reddit,
    Linkedin,
    Twitter,
    Rss,
    Bluesky,
}

impl NewsSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsSource::News => "news",
            NewsSource::Reddit => "reddit",
            NewsSource::Linkedin => "linkedin",
            NewsSource::Twitter => "twitter",
            NewsSource::Rss => "rss",
            NewsSource::Bluesky => "bluesky",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "news" => Some(NewsSource::News),
            "reddit" => Some(NewsSource::Reddit),
            "linkedin" => Some(NewsSource::Linkedin),
            "twitter" => Some(NewsSource::Twitter),
            "rss" => Some(NewsSource::Rss),
            "bluesky" => Some(NewsSource::Bluesky),
            _ => None,
        }
    }
}

impl fmt::Display for NewsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scraped post/article, before AI analysis.
///
/// `url` is the identity key for everything downstream: per-adapter dedup and
/// the storage upsert both key on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    pub url: String,
    pub title: String,
    pub content: String,
    pub source: NewsSource,
    pub published_at: Option<DateTime<Utc>>,
}

/// What one adapter produced: items plus any errors hit along the way.
///
/// Adapters never propagate errors past this boundary. Partial failure keeps
/// the partial items and records the rest here.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub source: NewsSource,
    pub items: Vec<RawItem>,
    pub errors: Vec<String>,
}

impl ScrapeOutcome {
    pub fn new(source: NewsSource) -> Self {
        ScrapeOutcome {
            source,
            items: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Aggregate view over one full scraping round.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeSummary {
    pub total_items: usize,
    pub items_by_source: BTreeMap<NewsSource, usize>,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

#[async_trait::async_trait]
pub trait Scraper: Send + Sync {
    /// Fetch whatever is currently available from this source. Must not
    /// return Err: failures are reported inside the outcome.
    async fn fetch(&self) -> ScrapeOutcome;
    fn source(&self) -> NewsSource;
}
