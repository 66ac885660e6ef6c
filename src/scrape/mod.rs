// src/scrape/mod.rs
pub mod bluesky;
pub mod linkedin;
pub mod news_api;
pub mod reddit;
pub mod rss;
pub mod twitter;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::scrape::types::{RawItem, ScrapeSummary, Scraper};

/// User-Agent sent to every upstream API.
pub const USER_AGENT: &str = "CIOPerinatalNews/2.0";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scrape_items_total", "Items returned per source.");
        describe_counter!(
            "scrape_errors_total",
            "Errors reported per source (including task failures)."
        );
        describe_histogram!("scrape_round_ms", "Full scraping round duration in milliseconds.");
        describe_histogram!("scrape_parse_ms", "Upstream payload parse time in milliseconds.");
    });
}

/// Shared reqwest client builder: UA + timeout, no panic path.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Normalize scraped prose: decode HTML entities, strip tags, collapse
/// whitespace. Keeps sentence punctuation since the text feeds the model.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// Char-boundary-safe truncation.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

/// Drop later occurrences of an already-seen URL, preserving order. Every
/// adapter applies this to its own run before returning; cross-adapter
/// duplicates are left for the store's unique key.
pub(crate) fn dedup_by_url(items: Vec<RawItem>) -> Vec<RawItem> {
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.url.trim().to_string()))
        .collect()
}

/// Run every scraper concurrently and wait for all of them to settle.
///
/// Each scraper runs in its own task: a panic in one is contained there and
/// recorded as a `Scraper failed:` entry while the others' items survive.
/// Items are concatenated in scraper order; no cross-source dedup happens
/// here (the store's url key handles collisions).
pub async fn run_all_scrapers(scrapers: &[Arc<dyn Scraper>]) -> (Vec<RawItem>, ScrapeSummary) {
    ensure_metrics_described();
    let started = Instant::now();

    let mut handles = Vec::with_capacity(scrapers.len());
    for scraper in scrapers {
        let scraper = Arc::clone(scraper);
        let source = scraper.source();
        handles.push((source, tokio::spawn(async move { scraper.fetch().await })));
    }

    let mut items: Vec<RawItem> = Vec::new();
    let mut errors: Vec<String> = Vec::new();
    let mut items_by_source: BTreeMap<_, _> = BTreeMap::new();

    for (source, handle) in handles {
        match handle.await {
            Ok(outcome) => {
                for err in &outcome.errors {
                    tracing::warn!(source = %source, error = %err, "scraper reported error");
                }
                counter!("scrape_items_total", "source" => source.as_str())
                    .increment(outcome.items.len() as u64);
                if !outcome.errors.is_empty() {
                    counter!("scrape_errors_total", "source" => source.as_str())
                        .increment(outcome.errors.len() as u64);
                }
                items_by_source.insert(source, outcome.items.len());
                items.extend(outcome.items);
                errors.extend(outcome.errors);
            }
            Err(join_err) => {
                tracing::error!(source = %source, error = %join_err, "scraper task failed");
                counter!("scrape_errors_total", "source" => source.as_str()).increment(1);
                items_by_source.insert(source, 0);
                errors.push(format!("Scraper failed: {source}: {join_err}"));
            }
        }
    }

    let duration_ms = started.elapsed().as_millis() as u64;
    histogram!("scrape_round_ms").record(duration_ms as f64);

    let summary = ScrapeSummary {
        total_items: items.len(),
        items_by_source,
        errors,
        duration_ms,
    };
    (items, summary)
}
