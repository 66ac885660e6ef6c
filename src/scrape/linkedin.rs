// src/scrape/linkedin.rs
//! LinkedIn adapter via Google Custom Search, scoped to linkedin.com/posts.
//! LinkedIn itself cannot be scraped, so public post snippets indexed by
//! Google are the workable (and permitted) stand-in. One query per topic.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::scrape::types::{NewsSource, RawItem, ScrapeOutcome, Scraper};
use crate::scrape::{dedup_by_url, http_client};
use crate::topics::Topics;

const CSE_URL: &str = "https://www.googleapis.com/customsearch/v1";
const RESULTS_PER_QUERY: u32 = 10;
const LOOKBACK_DAYS: i64 = 7;
const TOPIC_PAUSE: Duration = Duration::from_millis(1000);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
    error: Option<ApiError>,
}
#[derive(Debug, Deserialize)]
struct SearchResult {
    title: Option<String>,
    link: Option<String>,
    #[serde(default)]
    snippet: String,
    pagemap: Option<Pagemap>,
}
#[derive(Debug, Deserialize)]
struct Pagemap {
    #[serde(default)]
    metatags: Vec<Metatags>,
}
#[derive(Debug, Deserialize)]
struct Metatags {
    #[serde(rename = "article:published_time")]
    published_time: Option<String>,
}
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Map one CSE response into items. An `error` object in an HTTP-200 body is
/// still an upstream error (Google reports quota problems that way).
pub fn parse_results(json: &str) -> Result<Vec<RawItem>> {
    let resp: SearchResponse = serde_json::from_str(json).context("parsing google cse json")?;
    if let Some(err) = resp.error {
        bail!("{}", err.message);
    }

    let mut out = Vec::new();
    for result in resp.items {
        let (Some(link), Some(title)) = (result.link, result.title) else {
            continue;
        };
        if link.trim().is_empty() || title.trim().is_empty() {
            continue;
        }

        let published_at = result
            .pagemap
            .as_ref()
            .and_then(|pm| pm.metatags.first())
            .and_then(|mt| mt.published_time.as_deref())
            .and_then(parse_published_time);

        let content = if result.snippet.trim().is_empty() {
            title.clone()
        } else {
            result.snippet.clone()
        };

        out.push(RawItem {
            url: link,
            title,
            content,
            source: NewsSource::Linkedin,
            published_at,
        });
    }
    Ok(out)
}

fn parse_published_time(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub struct LinkedinScraper {
    client: reqwest::Client,
    api_key: Option<String>,
    cse_id: Option<String>,
    topics: Topics,
}

impl LinkedinScraper {
    pub fn new(api_key: Option<String>, cse_id: Option<String>, topics: Topics) -> Self {
        Self {
            client: http_client(Duration::from_secs(15)),
            api_key,
            cse_id,
            topics,
        }
    }

    /// `site:linkedin.com/posts (<kw1> OR <kw2>) after:<date>` for one topic.
    fn build_query(keywords: &[&str]) -> String {
        let after = (Utc::now() - chrono::Duration::days(LOOKBACK_DAYS))
            .format("%Y-%m-%d")
            .to_string();
        format!(
            "site:linkedin.com/posts ({}) after:{}",
            keywords.join(" OR "),
            after
        )
    }

    async fn search(&self, key: &str, cx: &str, query: &str) -> Result<String> {
        let resp = self
            .client
            .get(CSE_URL)
            .query(&[
                ("key", key),
                ("cx", cx),
                ("q", query),
                ("num", &RESULTS_PER_QUERY.to_string()),
            ])
            .send()
            .await
            .context("google cse http get")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("{status} - {body}");
        }
        resp.text().await.context("google cse body read")
    }
}

#[async_trait]
impl Scraper for LinkedinScraper {
    async fn fetch(&self) -> ScrapeOutcome {
        let mut out = ScrapeOutcome::new(NewsSource::Linkedin);

        let (Some(key), Some(cx)) = (self.api_key.as_deref(), self.cse_id.as_deref()) else {
            out.errors
                .push("GOOGLE_CSE_API_KEY or GOOGLE_CSE_ID is not configured".to_string());
            return out;
        };

        for (i, topic) in self.topics.topics.iter().enumerate() {
            if i > 0 {
                // Google CSE has strict daily quotas.
                tokio::time::sleep(TOPIC_PAUSE).await;
            }
            let keywords: Vec<&str> = topic.keywords.iter().take(2).map(|s| s.as_str()).collect();
            let query = Self::build_query(&keywords);

            let parsed = match self.search(key, cx, &query).await {
                Ok(body) => parse_results(&body),
                Err(e) => Err(e),
            };
            match parsed {
                Ok(items) => {
                    tracing::debug!(
                        category = %topic.category,
                        count = items.len(),
                        "linkedin query fetched"
                    );
                    out.items.extend(items);
                }
                Err(e) => out
                    .errors
                    .push(format!("Google CSE error for {}: {e:#}", topic.category)),
            }
        }

        // The same post can rank for more than one topic query.
        out.items = dedup_by_url(out.items);
        out
    }

    fn source(&self) -> NewsSource {
        NewsSource::Linkedin
    }
}
