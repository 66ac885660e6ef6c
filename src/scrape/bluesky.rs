// src/scrape/bluesky.rs
//! Bluesky adapter: keyword searches against the public AppView API.
//! No credential required; targets the MedSky community and healthcare
//! tech discussions.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::scrape::types::{NewsSource, RawItem, ScrapeOutcome, Scraper};
use crate::scrape::{dedup_by_url, http_client, truncate_chars};

const SEARCH_URL: &str = "https://public.api.bsky.app/xrpc/app.bsky.feed.searchPosts";

const SEARCH_QUERIES: &[&str] = &[
    "medical billing automation",
    "revenue cycle management",
    "preeclampsia research",
    "gestational diabetes",
    "CGM pregnancy",
    "healthcare RCM",
];

const POSTS_PER_QUERY: u32 = 10;
const TITLE_CAP: usize = 100;
const QUERY_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    posts: Vec<BskyPost>,
}
#[derive(Debug, Deserialize)]
struct BskyPost {
    uri: String,
    author: Author,
    record: Record,
}
#[derive(Debug, Deserialize)]
struct Author {
    handle: String,
}
#[derive(Debug, Deserialize)]
struct Record {
    #[serde(default)]
    text: String,
    #[serde(rename = "createdAt")]
    created_at: Option<String>,
}

/// Map one search response into items. The AT-URI tail is the post rkey,
/// which combined with the author handle gives the canonical web URL.
pub fn parse_search(json: &str) -> Result<Vec<RawItem>> {
    let resp: SearchResponse = serde_json::from_str(json).context("parsing bluesky search json")?;

    let mut out = Vec::new();
    for post in resp.posts {
        let Some(rkey) = post.uri.rsplit('/').next().filter(|s| !s.is_empty()) else {
            continue;
        };
        let url = format!("https://bsky.app/profile/{}/post/{}", post.author.handle, rkey);

        let text = post.record.text.trim();
        if text.is_empty() {
            continue;
        }
        let mut title = format!("@{}: {}", post.author.handle, truncate_chars(text, TITLE_CAP));
        if text.chars().count() > TITLE_CAP {
            title.push_str("...");
        }

        out.push(RawItem {
            url,
            title,
            content: text.to_string(),
            source: NewsSource::Bluesky,
            published_at: post
                .record
                .created_at
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        });
    }
    Ok(out)
}

pub struct BlueskyScraper {
    client: reqwest::Client,
}

impl BlueskyScraper {
    pub fn new() -> Self {
        Self {
            client: http_client(Duration::from_secs(15)),
        }
    }

    async fn search(&self, query: &str) -> Result<String> {
        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query), ("limit", &POSTS_PER_QUERY.to_string())])
            .send()
            .await
            .context("bluesky http get")?;
        if !resp.status().is_success() {
            bail!("HTTP {}", resp.status());
        }
        resp.text().await.context("bluesky body read")
    }
}

impl Default for BlueskyScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scraper for BlueskyScraper {
    async fn fetch(&self) -> ScrapeOutcome {
        let mut out = ScrapeOutcome::new(NewsSource::Bluesky);

        for (i, query) in SEARCH_QUERIES.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(QUERY_PAUSE).await;
            }
            let parsed = match self.search(query).await {
                Ok(body) => parse_search(&body),
                Err(e) => Err(e),
            };
            match parsed {
                Ok(items) => {
                    tracing::debug!(query, count = items.len(), "bluesky query fetched");
                    out.items.extend(items);
                }
                Err(e) => out.errors.push(format!("Bluesky query \"{query}\": {e:#}")),
            }
        }

        // Queries overlap heavily, so the same post often comes back twice.
        out.items = dedup_by_url(out.items);
        out
    }

    fn source(&self) -> NewsSource {
        NewsSource::Bluesky
    }
}
