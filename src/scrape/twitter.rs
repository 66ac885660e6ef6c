// src/scrape/twitter.rs
//! Twitter/X adapter via the Apify `apidojo/tweet-scraper` actor. There is no
//! affordable first-party search API, so keyword search is delegated to a
//! hosted actor run: start it, poll until it settles, then read its dataset.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scrape::types::{NewsSource, RawItem, ScrapeOutcome, Scraper};
use crate::scrape::{dedup_by_url, http_client};
use crate::topics::Topics;

const APIFY_BASE: &str = "https://api.apify.com/v2";

/// Actor ID for apidojo/tweet-scraper.
const TWEET_SCRAPER: &str = "61RPP7dywgiy0JPD0";

/// Searches per run are capped to control actor cost.
const SEARCH_TERM_CAP: usize = 5;
const MAX_TWEETS: u32 = 10;
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_POLL_ATTEMPTS: u32 = 12;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TweetSearchInput {
    search_terms: Vec<String>,
    max_items: u32,
    include_retweets: bool,
    language_code: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: T,
}
#[derive(Debug, Deserialize)]
struct RunData {
    id: String,
    status: String,
    #[serde(rename = "defaultDatasetId")]
    default_dataset_id: String,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    text: Option<String>,
    full_text: Option<String>,
    url: Option<String>,
    created_at: Option<String>,
    author: Option<TweetAuthor>,
}
#[derive(Debug, Deserialize)]
struct TweetAuthor {
    #[serde(rename = "userName")]
    user_name: Option<String>,
}

// Twitter's classic timestamp format, e.g. "Tue Aug 18 09:30:00 +0000 2026".
fn parse_tweet_date(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(ts, "%a %b %d %H:%M:%S %z %Y")
        .or_else(|_| DateTime::parse_from_rfc3339(ts))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Map an actor dataset dump into items.
pub fn parse_tweets(json: &str) -> Result<Vec<RawItem>> {
    let tweets: Vec<Tweet> = serde_json::from_str(json).context("parsing apify dataset json")?;

    let mut out = Vec::new();
    for tweet in tweets {
        let Some(url) = tweet.url.filter(|u| !u.trim().is_empty()) else {
            continue;
        };
        let Some(content) = tweet
            .full_text
            .as_deref()
            .or(tweet.text.as_deref())
            .filter(|t| !t.trim().is_empty())
        else {
            continue;
        };

        let handle = tweet
            .author
            .as_ref()
            .and_then(|a| a.user_name.as_deref())
            .unwrap_or("unknown");

        out.push(RawItem {
            url,
            title: format!("Tweet by @{handle}"),
            content: content.to_string(),
            source: NewsSource::Twitter,
            published_at: tweet.created_at.as_deref().and_then(parse_tweet_date),
        });
    }
    Ok(out)
}

pub struct TwitterScraper {
    client: reqwest::Client,
    api_key: Option<String>,
    search_terms: Vec<String>,
}

impl TwitterScraper {
    pub fn new(api_key: Option<String>, topics: &Topics) -> Self {
        let search_terms = topics
            .lead_keywords(2)
            .into_iter()
            .take(SEARCH_TERM_CAP)
            .map(|kw| format!("\"{kw}\""))
            .collect();
        Self {
            client: http_client(Duration::from_secs(30)),
            api_key,
            search_terms,
        }
    }

    async fn start_run(&self, token: &str) -> Result<RunData> {
        let input = TweetSearchInput {
            search_terms: self.search_terms.clone(),
            max_items: MAX_TWEETS,
            include_retweets: false,
            language_code: "en".to_string(),
        };
        let url = format!("{APIFY_BASE}/acts/{TWEET_SCRAPER}/runs");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&input)
            .send()
            .await
            .context("apify run start")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Apify run error: {status} - {body}");
        }
        let run: ApiResponse<RunData> = resp.json().await.context("apify run decode")?;
        Ok(run.data)
    }

    /// Poll until the run reaches a terminal state or the budget runs out.
    /// Transient poll failures are ignored; the next attempt retries.
    async fn poll_run(&self, token: &str, run_id: &str, mut status: String) -> String {
        let mut attempts = 0;
        while !is_terminal(&status) && attempts < MAX_POLL_ATTEMPTS {
            tokio::time::sleep(POLL_INTERVAL).await;
            let url = format!("{APIFY_BASE}/actor-runs/{run_id}");
            if let Ok(resp) = self.client.get(&url).bearer_auth(token).send().await {
                if resp.status().is_success() {
                    if let Ok(data) = resp.json::<ApiResponse<RunData>>().await {
                        status = data.data.status;
                    }
                }
            }
            attempts += 1;
        }
        status
    }

    async fn fetch_dataset(&self, token: &str, dataset_id: &str) -> Result<String> {
        let url = format!("{APIFY_BASE}/datasets/{dataset_id}/items?format=json");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .context("apify dataset get")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Apify dataset error: {status} - {body}");
        }
        resp.text().await.context("apify dataset read")
    }

    async fn run_search(&self, token: &str) -> Result<Vec<RawItem>> {
        let run = self.start_run(token).await?;
        tracing::debug!(run_id = %run.id, "apify run started");

        let status = self.poll_run(token, &run.id, run.status).await;
        if status != "SUCCEEDED" {
            bail!("Apify run did not complete successfully. Status: {status}");
        }

        let body = self.fetch_dataset(token, &run.default_dataset_id).await?;
        parse_tweets(&body)
    }
}

fn is_terminal(status: &str) -> bool {
    matches!(status, "SUCCEEDED" | "FAILED" | "ABORTED" | "TIMED-OUT")
}

#[async_trait]
impl Scraper for TwitterScraper {
    async fn fetch(&self) -> ScrapeOutcome {
        let mut out = ScrapeOutcome::new(NewsSource::Twitter);

        let Some(token) = self.api_key.as_deref() else {
            out.errors.push("APIFY_API_KEY is not configured".to_string());
            return out;
        };

        match self.run_search(token).await {
            Ok(items) => {
                tracing::debug!(count = items.len(), "apify tweets fetched");
                out.items = dedup_by_url(items);
            }
            Err(e) => out.errors.push(format!("{e:#}")),
        }

        out
    }

    fn source(&self) -> NewsSource {
        NewsSource::Twitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"[
        {
            "id": "1",
            "full_text": "Prior authorization automation is finally getting payer attention.",
            "url": "https://x.com/rcmnerd/status/1",
            "created_at": "Tue Aug 18 09:30:00 +0000 2026",
            "author": { "userName": "rcmnerd", "name": "RCM Nerd" }
        },
        {
            "id": "2",
            "text": "short-text variant",
            "url": "https://x.com/other/status/2",
            "created_at": "2026-08-18T10:00:00Z",
            "author": null
        },
        {
            "id": "3",
            "text": "",
            "url": "https://x.com/empty/status/3"
        }
    ]"#;

    #[test]
    fn maps_tweets_and_skips_empty_text() {
        let items = parse_tweets(DATASET).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Tweet by @rcmnerd");
        assert!(items[0].published_at.is_some());
        assert_eq!(items[1].title, "Tweet by @unknown");
        assert!(items[1].published_at.is_some());
    }

    #[test]
    fn twitter_classic_dates_parse() {
        assert!(parse_tweet_date("Tue Aug 18 09:30:00 +0000 2026").is_some());
        assert!(parse_tweet_date("2026-08-18T10:00:00Z").is_some());
        assert!(parse_tweet_date("yesterday-ish").is_none());
    }

    #[test]
    fn search_terms_are_quoted_and_capped() {
        let scraper = TwitterScraper::new(Some("token".into()), &Topics::builtin());
        assert_eq!(scraper.search_terms.len(), SEARCH_TERM_CAP);
        assert_eq!(scraper.search_terms[0], "\"medical billing automation\"");
    }

    #[tokio::test]
    async fn missing_key_reports_configuration_error() {
        let scraper = TwitterScraper::new(None, &Topics::builtin());
        let outcome = scraper.fetch().await;
        assert!(outcome.items.is_empty());
        assert_eq!(outcome.errors, vec!["APIFY_API_KEY is not configured".to_string()]);
    }
}
