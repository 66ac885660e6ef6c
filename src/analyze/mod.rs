// src/analyze/mod.rs
//! Relevance analysis over scraped items.
//!
//! Items are scored in small batches to stay inside model rate limits: each
//! batch runs concurrently, batches run back to back with a fixed pause
//! between them. A failed item is logged and dropped; it never takes its
//! batch down with it.

pub mod ai;

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::scrape::types::RawItem;
use ai::{AiAnalyzer, Analysis};

static METRICS_DESCRIBED: OnceCell<()> = OnceCell::new();

fn ensure_metrics_described() {
    METRICS_DESCRIBED.get_or_init(|| {
        describe_counter!(
            "analyze_enriched_total",
            "Items successfully scored by the model."
        );
        describe_counter!(
            "analyze_dropped_total",
            "Items dropped because scoring failed."
        );
        describe_histogram!("analyze_batch_ms", "Wall time per scoring batch in milliseconds.");
    });
}

/// A scraped item plus its validated model verdict.
#[derive(Debug, Clone)]
pub struct EnrichedItem {
    pub raw: RawItem,
    pub analysis: Analysis,
}

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub batch_size: usize,
    pub delay: Duration,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            batch_size: 5,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Score every item, preserving only the ones the model handled cleanly.
pub async fn analyze_items(
    analyzer: &Arc<dyn AiAnalyzer>,
    items: Vec<RawItem>,
    opts: &AnalyzeOptions,
) -> Vec<EnrichedItem> {
    ensure_metrics_described();

    let total = items.len();
    let batch_size = opts.batch_size.max(1);
    let mut enriched = Vec::with_capacity(total);
    let mut dropped = 0usize;

    let mut remaining = items.into_iter();
    let mut first_batch = true;
    loop {
        let batch: Vec<RawItem> = remaining.by_ref().take(batch_size).collect();
        if batch.is_empty() {
            break;
        }
        if !first_batch {
            tokio::time::sleep(opts.delay).await;
        }
        first_batch = false;

        let started = std::time::Instant::now();
        let mut set = JoinSet::new();
        for item in batch {
            let analyzer = Arc::clone(analyzer);
            set.spawn(async move {
                let verdict = analyzer.analyze(&item).await;
                (item, verdict)
            });
        }
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((raw, Ok(analysis))) => enriched.push(EnrichedItem { raw, analysis }),
                Ok((raw, Err(e))) => {
                    dropped += 1;
                    warn!(url = %raw.url, error = format!("{e:#}"), "analysis failed, item dropped");
                }
                Err(join_err) => {
                    dropped += 1;
                    warn!(error = %join_err, "analysis task failed, item dropped");
                }
            }
        }
        histogram!("analyze_batch_ms").record(started.elapsed().as_millis() as f64);
        debug!(
            scored = enriched.len(),
            dropped, total, "analysis batch complete"
        );
    }

    counter!("analyze_enriched_total").increment(enriched.len() as u64);
    counter!("analyze_dropped_total").increment(dropped as u64);
    enriched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::types::NewsSource;
    use crate::topics::TopicCategory;
    use anyhow::{anyhow, bail, Result};
    use async_trait::async_trait;

    fn item(url: &str, title: &str) -> RawItem {
        RawItem {
            url: url.to_string(),
            title: title.to_string(),
            content: format!("{title} body"),
            source: NewsSource::Rss,
            published_at: None,
        }
    }

    /// Scores by title prefix: "fail" errors, "panic" panics, a digit-prefixed
    /// title scores that digit.
    struct ScriptedAnalyzer;

    #[async_trait]
    impl AiAnalyzer for ScriptedAnalyzer {
        async fn analyze(&self, item: &RawItem) -> Result<Analysis> {
            if item.title.starts_with("fail") {
                bail!("scripted failure");
            }
            if item.title.starts_with("panic") {
                panic!("scripted panic");
            }
            let score = item
                .title
                .chars()
                .next()
                .and_then(|c| c.to_digit(10))
                .ok_or_else(|| anyhow!("no score digit"))? as i32;
            Ok(Analysis {
                score,
                category: TopicCategory::Other,
                summary: format!("summary for {}", item.title),
            })
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn failures_are_dropped_without_affecting_siblings() {
        let analyzer: Arc<dyn AiAnalyzer> = Arc::new(ScriptedAnalyzer);
        let items = vec![
            item("https://a.example/1", "7 keep"),
            item("https://a.example/2", "fail me"),
            item("https://a.example/3", "panic now"),
            item("https://a.example/4", "3 keep"),
        ];
        let enriched = analyze_items(&analyzer, items, &AnalyzeOptions::default()).await;

        assert_eq!(enriched.len(), 2);
        let mut scores: Vec<i32> = enriched.iter().map(|e| e.analysis.score).collect();
        scores.sort_unstable();
        assert_eq!(scores, vec![3, 7]);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let analyzer: Arc<dyn AiAnalyzer> = Arc::new(ScriptedAnalyzer);
        let enriched = analyze_items(&analyzer, Vec::new(), &AnalyzeOptions::default()).await;
        assert!(enriched.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn delay_runs_between_batches_but_not_after_the_last() {
        let analyzer: Arc<dyn AiAnalyzer> = Arc::new(ScriptedAnalyzer);
        let items: Vec<RawItem> = (0..7)
            .map(|i| item(&format!("https://a.example/{i}"), "5 item"))
            .collect();
        let opts = AnalyzeOptions {
            batch_size: 5,
            delay: Duration::from_millis(1000),
        };

        let started = tokio::time::Instant::now();
        let enriched = analyze_items(&analyzer, items, &opts).await;
        let elapsed = started.elapsed();

        assert_eq!(enriched.len(), 7);
        // Two batches, so exactly one inter-batch pause on the paused clock.
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed < Duration::from_millis(2000));
    }
}
