// tests/metrics_endpoint.rs
//
// Prometheus exposition after a real ingest run. One test only: the recorder
// installs process-wide, so this file must not gain siblings that install it
// again.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{self, Body};
use axum::http::Request;
use http::StatusCode;
use tower::ServiceExt;

use perinatal_news_curator::analyze::ai::{AiAnalyzer, Analysis};
use perinatal_news_curator::api::{create_router, AppState};
use perinatal_news_curator::config::IngestSettings;
use perinatal_news_curator::metrics::Metrics;
use perinatal_news_curator::pipeline::IngestPipeline;
use perinatal_news_curator::scrape::types::{NewsSource, RawItem, ScrapeOutcome, Scraper};
use perinatal_news_curator::store::memory::MemStore;
use perinatal_news_curator::store::NewsStore;
use perinatal_news_curator::topics::TopicCategory;

struct OneItemScraper;

#[async_trait]
impl Scraper for OneItemScraper {
    async fn fetch(&self) -> ScrapeOutcome {
        let mut out = ScrapeOutcome::new(NewsSource::Rss);
        out.items.push(RawItem {
            url: "https://rss.example/metrics-item".to_string(),
            title: "Metrics item".to_string(),
            content: "body".to_string(),
            source: NewsSource::Rss,
            published_at: None,
        });
        out
    }

    fn source(&self) -> NewsSource {
        NewsSource::Rss
    }
}

struct HighScorer;

#[async_trait]
impl AiAnalyzer for HighScorer {
    async fn analyze(&self, _item: &RawItem) -> Result<Analysis> {
        Ok(Analysis {
            score: 9,
            category: TopicCategory::Other,
            summary: "Always relevant.".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "high"
    }
}

#[tokio::test]
async fn metrics_endpoint_exposes_pipeline_series() {
    let settings = IngestSettings::default();
    let metrics = Metrics::init(&settings);

    let store: Arc<dyn NewsStore> = Arc::new(MemStore::new());
    let pipeline = IngestPipeline::new(
        vec![Arc::new(OneItemScraper)],
        Arc::new(HighScorer),
        Arc::clone(&store),
        settings,
    );
    let state = AppState {
        pipeline: Arc::new(pipeline),
        store,
        cron_secret: Some("s".to_string()),
        retention_days: 90,
    };
    let app = create_router(state).merge(metrics.router());

    // Drive one authorized run so the counters exist.
    let resp = app
        .clone()
        .oneshot(
            Request::get("/api/ingest")
                .header("authorization", "Bearer s")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap(); // 1 MiB
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    for needle in [
        "ingest_min_relevance_score",
        "ingest_retention_days",
        "ingest_runs_total",
        "ingest_items_inserted_total",
        "ingest_run_ms",
        "scrape_items_total",
        "analyze_enriched_total",
    ] {
        assert!(
            text.contains(needle),
            "metrics exposition missing '{needle}'\n{text}"
        );
    }
}
