// src/scrape/news_api.rs
//! NewsAPI adapter: one broad `everything` query across a fixed allowlist of
//! medical news domains, bounded to the last 24 hours.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::scrape::types::{NewsSource, RawItem, ScrapeOutcome, Scraper};
use crate::scrape::{dedup_by_url, http_client};
use crate::topics::Topics;

const NEWS_API_URL: &str = "https://newsapi.org/v2/everything";

const DOMAINS: &[&str] = &[
    "medscape.com",
    "healio.com",
    "medpagetoday.com",
    "ajmc.com",
    "beckershospitalreview.com",
];

const PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    articles: Vec<Article>,
}
#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    content: Option<String>,
}

/// Map a NewsAPI response body into items. A non-"ok" payload status is an
/// upstream error even when the HTTP status was 200.
pub fn parse_articles(json: &str) -> Result<Vec<RawItem>> {
    let resp: NewsApiResponse = serde_json::from_str(json).context("parsing newsapi json")?;
    if resp.status != "ok" {
        bail!("NewsAPI returned status: {}", resp.status);
    }

    let mut out = Vec::new();
    for article in resp.articles {
        let (Some(url), Some(title)) = (article.url, article.title) else {
            continue;
        };
        if url.trim().is_empty() || title.trim().is_empty() {
            continue;
        }

        let content = article
            .description
            .filter(|s| !s.trim().is_empty())
            .or(article.content.filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| title.clone());

        out.push(RawItem {
            url,
            title,
            content,
            source: NewsSource::News,
            published_at: article
                .published_at
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        });
    }
    Ok(out)
}

pub struct NewsApiScraper {
    client: reqwest::Client,
    api_key: Option<String>,
    query: String,
}

impl NewsApiScraper {
    pub fn new(api_key: Option<String>, topics: &Topics) -> Self {
        // Top-2 keywords per topic keep the query inside NewsAPI's length cap.
        let query = topics.lead_keywords(2).join(" OR ");
        Self {
            client: http_client(Duration::from_secs(15)),
            api_key,
            query,
        }
    }

    async fn fetch_articles(&self, api_key: &str) -> Result<String> {
        let from = (Utc::now() - chrono::Duration::days(1)).to_rfc3339();
        let resp = self
            .client
            .get(NEWS_API_URL)
            .query(&[
                ("q", self.query.as_str()),
                ("domains", &DOMAINS.join(",")),
                ("from", &from),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", &PAGE_SIZE.to_string()),
                ("apiKey", api_key),
            ])
            .send()
            .await
            .context("newsapi http get")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("NewsAPI error: {status} - {body}");
        }
        resp.text().await.context("newsapi body read")
    }
}

#[async_trait]
impl Scraper for NewsApiScraper {
    async fn fetch(&self) -> ScrapeOutcome {
        let mut out = ScrapeOutcome::new(NewsSource::News);

        let Some(api_key) = self.api_key.as_deref() else {
            out.errors.push("NEWS_API_KEY is not configured".to_string());
            return out;
        };

        let parsed = match self.fetch_articles(api_key).await {
            Ok(body) => parse_articles(&body),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(items) => {
                tracing::debug!(count = items.len(), "newsapi articles fetched");
                out.items = dedup_by_url(items);
            }
            Err(e) => out.errors.push(format!("NewsAPI: {e:#}")),
        }

        out
    }

    fn source(&self) -> NewsSource {
        NewsSource::News
    }
}
