// src/scrape/reddit.rs
//! Reddit adapter: hot listings from a fixed set of medical subreddits,
//! filtered down to posts that mention a tracked topic keyword. Uses the
//! public JSON API, no credential required.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use crate::scrape::types::{NewsSource, RawItem, ScrapeOutcome, Scraper};
use crate::scrape::{dedup_by_url, http_client};
use crate::topics::Topics;

const REDDIT_BASE: &str = "https://www.reddit.com";

const SUBREDDITS: &[&str] = &[
    "medicine",
    "obgyn",
    "AskDocs",
    "medicalbilling",
    "healthIT",
    "MedicalCoding",
];

const LISTING_LIMIT: u32 = 25;
const SUBREDDIT_PAUSE: Duration = Duration::from_millis(1000);

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}
#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Post>,
}
#[derive(Debug, Deserialize)]
struct Post {
    data: PostData,
}
#[derive(Debug, Deserialize)]
struct PostData {
    title: String,
    #[serde(default)]
    selftext: String,
    permalink: String,
    // Reddit reports this as a float.
    created_utc: f64,
}

/// Parse one hot listing, keeping only posts that hit a tracked keyword.
/// `keywords` must already be lowercased.
pub fn parse_listing(json: &str, keywords: &[String]) -> Result<Vec<RawItem>> {
    let listing: Listing = serde_json::from_str(json).context("parsing reddit listing json")?;

    let mut out = Vec::new();
    for post in listing.data.children {
        let p = post.data;
        let haystack = format!("{} {}", p.title, p.selftext).to_lowercase();
        if !keywords.iter().any(|kw| haystack.contains(kw.as_str())) {
            continue;
        }

        let content = if p.selftext.trim().is_empty() {
            p.title.clone()
        } else {
            p.selftext.clone()
        };

        out.push(RawItem {
            // Permalink rather than the submitted link, so discussion posts
            // and link posts both key on the thread.
            url: format!("{REDDIT_BASE}{}", p.permalink),
            title: p.title,
            content,
            source: NewsSource::Reddit,
            published_at: DateTime::from_timestamp(p.created_utc as i64, 0),
        });
    }
    Ok(out)
}

pub struct RedditScraper {
    client: reqwest::Client,
    /// Lead topic keywords, lowercased once at construction.
    keywords: Vec<String>,
}

impl RedditScraper {
    pub fn new(topics: &Topics) -> Self {
        Self {
            client: http_client(Duration::from_secs(15)),
            keywords: topics
                .lead_keywords(2)
                .into_iter()
                .map(|kw| kw.to_lowercase())
                .collect(),
        }
    }

    async fn fetch_subreddit(&self, subreddit: &str) -> Result<String> {
        let url = format!("{REDDIT_BASE}/r/{subreddit}/hot.json?limit={LISTING_LIMIT}");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("reddit http get")?;
        if !resp.status().is_success() {
            bail!("HTTP {}", resp.status());
        }
        resp.text().await.context("reddit body read")
    }
}

#[async_trait]
impl Scraper for RedditScraper {
    async fn fetch(&self) -> ScrapeOutcome {
        let mut out = ScrapeOutcome::new(NewsSource::Reddit);

        for (i, subreddit) in SUBREDDITS.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(SUBREDDIT_PAUSE).await;
            }
            let parsed = match self.fetch_subreddit(subreddit).await {
                Ok(body) => parse_listing(&body, &self.keywords),
                Err(e) => Err(e),
            };
            match parsed {
                Ok(items) => {
                    tracing::debug!(subreddit, count = items.len(), "reddit listing fetched");
                    out.items.extend(items);
                }
                Err(e) => out.errors.push(format!("Reddit r/{subreddit}: {e:#}")),
            }
        }

        out.items = dedup_by_url(out.items);
        out
    }

    fn source(&self) -> NewsSource {
        NewsSource::Reddit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_lowercase()).collect()
    }

    const LISTING: &str = r#"{
        "data": { "children": [
            { "data": {
                "title": "Our clinic introduced GDM screening earlier",
                "selftext": "Thoughts on gestational diabetes protocols?",
                "permalink": "/r/obgyn/comments/abc/gdm_screening/",
                "created_utc": 1755500000.0
            }},
            { "data": {
                "title": "Completely unrelated thread",
                "selftext": "weekend plans",
                "permalink": "/r/obgyn/comments/def/weekend/",
                "created_utc": 1755500001.0
            }}
        ]}
    }"#;

    #[test]
    fn keeps_only_keyword_matches() {
        let items = parse_listing(LISTING, &kw(&["gestational diabetes"])).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].url,
            "https://www.reddit.com/r/obgyn/comments/abc/gdm_screening/"
        );
        assert_eq!(items[0].source, NewsSource::Reddit);
        assert!(items[0].published_at.is_some());
    }

    #[test]
    fn match_is_case_insensitive_over_title_and_body() {
        let items = parse_listing(LISTING, &kw(&["GDM"])).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].title.contains("GDM"));
    }

    #[test]
    fn link_posts_fall_back_to_title_content() {
        let json = r#"{ "data": { "children": [
            { "data": {
                "title": "preeclampsia trial results",
                "selftext": "",
                "permalink": "/r/medicine/comments/ghi/trial/",
                "created_utc": 1755500002.0
            }}
        ]}}"#;
        let items = parse_listing(json, &kw(&["preeclampsia"])).unwrap();
        assert_eq!(items[0].content, "preeclampsia trial results");
    }
}
