// src/scrape/rss.rs
//! RSS adapter: fixed list of medical-journal and healthcare-news feeds.
//! High-reliability structured sources, so this adapter needs no credential.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::scrape::types::{NewsSource, RawItem, ScrapeOutcome, Scraper};
use crate::scrape::{clean_text, dedup_by_url, http_client, truncate_chars};

const FEEDS: &[(&str, &str)] = &[
    ("https://www.healthcareitnews.com/rss/news", "Healthcare IT News"),
    ("https://www.beckershospitalreview.com/rss.xml", "Becker's Hospital Review"),
    ("https://www.fiercehealthcare.com/rss", "Fierce Healthcare"),
    ("https://rss.sciencedirect.com/publication/science/00029378", "AJOG (Gray Journal)"),
    ("https://www.medpagetoday.com/rss/obgyn.xml", "MedPage Today - OBGYN"),
];

const ITEMS_PER_FEED: usize = 10;
const CONTENT_CAP: usize = 1000;
const FEED_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_pub_date(ts: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = OffsetDateTime::parse(ts, &Rfc2822) {
        let secs = dt.to_offset(UtcOffset::UTC).unix_timestamp();
        return DateTime::from_timestamp(secs, 0);
    }
    // A few feeds publish ISO dates instead.
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse one feed document into items. Feeds list newest first, so the head
/// of the channel is the recent window we keep.
pub fn parse_feed(xml: &str, label: &str) -> Result<Vec<RawItem>> {
    let t0 = Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).with_context(|| format!("parsing {label} feed xml"))?;

    let mut out = Vec::new();
    for it in rss.channel.item.into_iter().take(ITEMS_PER_FEED) {
        let (Some(link), Some(title)) = (it.link, it.title) else {
            continue;
        };
        let title = clean_text(&title);
        if link.trim().is_empty() || title.is_empty() {
            continue;
        }

        let description = it.description.as_deref().map(clean_text).unwrap_or_default();
        let content = if description.is_empty() {
            title.clone()
        } else {
            truncate_chars(&description, CONTENT_CAP)
        };

        out.push(RawItem {
            url: link.trim().to_string(),
            title,
            content,
            source: NewsSource::Rss,
            published_at: it.pub_date.as_deref().and_then(parse_pub_date),
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("scrape_parse_ms", "source" => "rss").record(ms);
    Ok(out)
}

pub struct RssScraper {
    client: reqwest::Client,
}

impl RssScraper {
    pub fn new() -> Self {
        Self {
            client: http_client(Duration::from_secs(20)),
        }
    }

    async fn fetch_feed(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await.context("feed http get")?;
        if !resp.status().is_success() {
            bail!("HTTP {}", resp.status());
        }
        resp.text().await.context("feed body read")
    }
}

impl Default for RssScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scraper for RssScraper {
    async fn fetch(&self) -> ScrapeOutcome {
        let mut out = ScrapeOutcome::new(NewsSource::Rss);

        for (i, (url, label)) in FEEDS.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(FEED_PAUSE).await;
            }
            let parsed = match self.fetch_feed(url).await {
                Ok(xml) => parse_feed(&xml, label),
                Err(e) => Err(e),
            };
            match parsed {
                Ok(items) => {
                    tracing::debug!(feed = label, count = items.len(), "rss feed fetched");
                    out.items.extend(items);
                }
                Err(e) => out.errors.push(format!("RSS {label} failed: {e:#}")),
            }
        }

        out.items = dedup_by_url(out.items);
        out
    }

    fn source(&self) -> NewsSource {
        NewsSource::Rss
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Feed</title>
  <item>
    <title>CGM coverage expands for gestational diabetes</title>
    <link>https://example.org/cgm</link>
    <description>&lt;p&gt;Payers widen &amp;nbsp;CGM access.&lt;/p&gt;</description>
    <pubDate>Tue, 18 Aug 2026 09:30:00 GMT</pubDate>
  </item>
  <item>
    <title>No link here</title>
    <description>dropped</description>
  </item>
</channel></rss>"#;

    #[test]
    fn parses_items_and_skips_linkless_entries() {
        let items = parse_feed(SAMPLE, "Test Feed").unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.url, "https://example.org/cgm");
        assert_eq!(item.content, "Payers widen CGM access.");
        assert_eq!(item.source, NewsSource::Rss);
        assert!(item.published_at.is_some());
    }

    #[test]
    fn pub_date_accepts_rfc2822_and_iso() {
        assert!(parse_pub_date("Tue, 18 Aug 2026 09:30:00 GMT").is_some());
        assert!(parse_pub_date("2026-08-18T09:30:00Z").is_some());
        assert!(parse_pub_date("sometime yesterday").is_none());
    }

    #[test]
    fn content_falls_back_to_title() {
        let xml = r#"<rss><channel><item>
            <title>Bare item</title>
            <link>https://example.org/bare</link>
        </item></channel></rss>"#;
        let items = parse_feed(xml, "Bare").unwrap();
        assert_eq!(items[0].content, "Bare item");
    }
}
