// src/pipeline.rs
//! End-to-end ingest run: scrape every source, score what came back, filter
//! by relevance, and store the survivors. Each stage degrades instead of
//! failing the run; only a storage error aborts, and the HTTP layer turns
//! that into a 500.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::info;

use crate::analyze::ai::AiAnalyzer;
use crate::analyze::{analyze_items, AnalyzeOptions, EnrichedItem};
use crate::config::IngestSettings;
use crate::scrape::run_all_scrapers;
use crate::scrape::types::{NewsSource, Scraper};
use crate::store::{InsertNewsItem, NewsStore};

static METRICS_DESCRIBED: OnceCell<()> = OnceCell::new();

fn ensure_metrics_described() {
    METRICS_DESCRIBED.get_or_init(|| {
        describe_counter!("ingest_runs_total", "Completed ingest runs by outcome.");
        describe_counter!(
            "ingest_items_inserted_total",
            "Curated items written to the store."
        );
        describe_histogram!("ingest_run_ms", "Wall time per ingest run in milliseconds.");
    });
}

/// Summary returned by an ingest run and serialized as the trigger response.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub scraped: usize,
    pub analyzed: usize,
    pub inserted: usize,
    #[serde(rename = "itemsBySource", skip_serializing_if = "Option::is_none")]
    pub items_by_source: Option<BTreeMap<NewsSource, usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    /// Milliseconds.
    pub duration: u64,
}

/// Keep items at or above the cutoff, preserving order.
pub fn apply_threshold(items: Vec<EnrichedItem>, min_score: i32) -> Vec<EnrichedItem> {
    items
        .into_iter()
        .filter(|item| item.analysis.score >= min_score)
        .collect()
}

pub struct IngestPipeline {
    scrapers: Vec<Arc<dyn Scraper>>,
    analyzer: Arc<dyn AiAnalyzer>,
    store: Arc<dyn NewsStore>,
    settings: IngestSettings,
}

impl IngestPipeline {
    pub fn new(
        scrapers: Vec<Arc<dyn Scraper>>,
        analyzer: Arc<dyn AiAnalyzer>,
        store: Arc<dyn NewsStore>,
        settings: IngestSettings,
    ) -> Self {
        Self {
            scrapers,
            analyzer,
            store,
            settings,
        }
    }

    /// Run scrape, analyze, filter, store. Ends early (still successfully)
    /// when a stage produces nothing worth carrying forward.
    pub async fn run(&self) -> Result<IngestReport> {
        ensure_metrics_described();
        let started = Instant::now();
        info!("starting ingest run");

        let (items, summary) = run_all_scrapers(&self.scrapers).await;
        let scraped = items.len();
        if items.is_empty() {
            info!("no items scraped, ending run");
            counter!("ingest_runs_total", "outcome" => "empty").increment(1);
            return Ok(IngestReport {
                success: true,
                message: Some("No new items found".to_string()),
                scraped: 0,
                analyzed: 0,
                inserted: 0,
                items_by_source: None,
                errors: None,
                duration: started.elapsed().as_millis() as u64,
            });
        }

        info!(count = scraped, "analyzing scraped items");
        let opts = AnalyzeOptions {
            batch_size: self.settings.batch_size,
            delay: self.settings.batch_delay,
        };
        let enriched = analyze_items(&self.analyzer, items, &opts).await;
        let analyzed = enriched.len();

        let relevant = apply_threshold(enriched, self.settings.min_relevance_score);
        info!(
            kept = relevant.len(),
            analyzed,
            min_score = self.settings.min_relevance_score,
            "relevance threshold applied"
        );
        if relevant.is_empty() {
            counter!("ingest_runs_total", "outcome" => "no_relevant").increment(1);
            return Ok(IngestReport {
                success: true,
                message: Some("No relevant items found".to_string()),
                scraped,
                analyzed,
                inserted: 0,
                items_by_source: None,
                errors: None,
                duration: started.elapsed().as_millis() as u64,
            });
        }

        let inserts: Vec<InsertNewsItem> = relevant.into_iter().map(Into::into).collect();
        let inserted = self
            .store
            .upsert_items(inserts)
            .await
            .context("storing curated items")?
            .len();

        let duration = started.elapsed().as_millis() as u64;
        counter!("ingest_runs_total", "outcome" => "completed").increment(1);
        counter!("ingest_items_inserted_total").increment(inserted as u64);
        histogram!("ingest_run_ms").record(duration as f64);
        info!(scraped, analyzed, inserted, duration_ms = duration, "ingest run complete");

        Ok(IngestReport {
            success: true,
            message: Some("Ingestion completed successfully".to_string()),
            scraped,
            analyzed,
            inserted,
            items_by_source: Some(summary.items_by_source),
            errors: (!summary.errors.is_empty()).then_some(summary.errors),
            duration,
        })
    }
}
