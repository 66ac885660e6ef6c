// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET  /health
// - GET  /api/ingest        (bearer gating + a full authorized run)
// - GET  /api/items, /api/items/{id}
// - GET  /api/search
// - POST /api/bookmark
// - GET  /api/stats
// - POST /api/maintenance/prune

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value as Json};
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use perinatal_news_curator::analyze::ai::{AiAnalyzer, Analysis};
use perinatal_news_curator::api::{create_router, AppState};
use perinatal_news_curator::config::IngestSettings;
use perinatal_news_curator::pipeline::IngestPipeline;
use perinatal_news_curator::scrape::types::{NewsSource, RawItem, ScrapeOutcome, Scraper};
use perinatal_news_curator::store::memory::MemStore;
use perinatal_news_curator::store::{InsertNewsItem, NewsStore};
use perinatal_news_curator::topics::TopicCategory;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests
const SECRET: &str = "test-secret";
const WIRED_URL: &str = "https://news.example/wired";

struct FixedScraper {
    source: NewsSource,
    items: Vec<RawItem>,
}

#[async_trait]
impl Scraper for FixedScraper {
    async fn fetch(&self) -> ScrapeOutcome {
        let mut out = ScrapeOutcome::new(self.source);
        out.items = self.items.clone();
        out
    }

    fn source(&self) -> NewsSource {
        self.source
    }
}

struct ScriptedAnalyzer {
    scores: HashMap<String, i32>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl AiAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, item: &RawItem) -> Result<Analysis> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(&score) = self.scores.get(&item.url) else {
            bail!("no scripted score for {}", item.url);
        };
        Ok(Analysis {
            score,
            category: TopicCategory::Gdm,
            summary: "Scripted summary. Two sentences.".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Router over one news scraper (one item scoring 8), a scripted scorer, and
/// a fresh in-memory store.
fn test_app(cron_secret: Option<&str>) -> (Router, Arc<MemStore>, Arc<AtomicUsize>) {
    let store = Arc::new(MemStore::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let scrapers: Vec<Arc<dyn Scraper>> = vec![Arc::new(FixedScraper {
        source: NewsSource::News,
        items: vec![RawItem {
            url: WIRED_URL.to_string(),
            title: "CGM pilot expands".to_string(),
            content: "Coverage for CGM in pregnancy grows".to_string(),
            source: NewsSource::News,
            published_at: None,
        }],
    })];
    let analyzer: Arc<dyn AiAnalyzer> = Arc::new(ScriptedAnalyzer {
        scores: HashMap::from([(WIRED_URL.to_string(), 8)]),
        calls: Arc::clone(&calls),
    });
    let settings = IngestSettings {
        batch_delay: std::time::Duration::from_millis(0),
        ..IngestSettings::default()
    };
    let pipeline = IngestPipeline::new(
        scrapers,
        analyzer,
        Arc::clone(&store) as Arc<dyn NewsStore>,
        settings,
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
        store: Arc::clone(&store) as Arc<dyn NewsStore>,
        cron_secret: cron_secret.map(str::to_string),
        retention_days: 90,
    };
    (create_router(state), store, calls)
}

async fn read_json(resp: Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json body")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET request")
}

fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .expect("build GET request")
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST request")
}

fn seed_item(url: &str, title: &str, score: i32) -> InsertNewsItem {
    InsertNewsItem {
        url: url.to_string(),
        title: title.to_string(),
        content: format!("{title} content"),
        source: NewsSource::Rss,
        ai_summary: format!("{title} summary"),
        relevance_score: score,
        category: TopicCategory::Preeclampsia,
        published_at: None,
    }
}

#[tokio::test]
async fn health_returns_200_and_ok_body() {
    let (app, _, _) = test_app(Some(SECRET));

    let resp = app.oneshot(get("/health")).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "ok");
}

#[tokio::test]
async fn ingest_without_bearer_is_401_and_does_no_work() {
    let (app, store, calls) = test_app(Some(SECRET));

    let resp = app.oneshot(get("/api/ingest")).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let v = read_json(resp).await;
    assert_eq!(v["error"], "Unauthorized");

    assert_eq!(calls.load(Ordering::SeqCst), 0, "scorer must not run");
    assert_eq!(store.stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn ingest_with_wrong_bearer_is_401() {
    let (app, _, calls) = test_app(Some(SECRET));

    let resp = app
        .oneshot(get_with_bearer("/api/ingest", "nope"))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ingest_without_configured_secret_is_500() {
    let (app, store, calls) = test_app(None);

    let resp = app
        .oneshot(get_with_bearer("/api/ingest", SECRET))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let v = read_json(resp).await;
    assert_eq!(v["error"], "Server configuration error");

    assert_eq!(calls.load(Ordering::SeqCst), 0, "misconfiguration must fail before work");
    assert_eq!(store.stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn authorized_ingest_runs_the_pipeline() {
    let (app, store, _) = test_app(Some(SECRET));

    let resp = app
        .oneshot(get_with_bearer("/api/ingest", SECRET))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["success"], true);
    assert_eq!(v["scraped"], 1);
    assert_eq!(v["analyzed"], 1);
    assert_eq!(v["inserted"], 1);
    assert_eq!(v["itemsBySource"]["news"], 1);
    assert!(v.get("duration").is_some(), "missing 'duration'");

    let stored = store.stats().await.unwrap();
    assert_eq!(stored.total, 1);
}

#[tokio::test]
async fn items_listing_point_lookup_and_filter_validation() {
    let (app, store, _) = test_app(Some(SECRET));
    store.upsert_items(vec![seed_item("https://example.org/a", "Aspirin trial", 9)])
        .await
        .unwrap();

    let resp = app.clone().oneshot(get("/api/items")).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["success"], true);
    assert_eq!(v["count"], 1);
    let id = v["items"][0]["id"].as_str().expect("item id").to_string();
    assert_eq!(v["items"][0]["category"], "preeclampsia");

    let resp = app
        .clone()
        .oneshot(get(&format!("/api/items/{id}")))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["item"]["url"], "https://example.org/a");

    let resp = app
        .clone()
        .oneshot(get(&format!("/api/items/{}", uuid::Uuid::new_v4())))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let v = read_json(resp).await;
    assert_eq!(v["error"], "Item not found");

    let resp = app
        .clone()
        .oneshot(get("/api/items?category=finance"))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = read_json(resp).await;
    assert_eq!(v["error"], "Unknown category");

    let resp = app
        .oneshot(get("/api/items?minScore=10"))
        .await
        .expect("oneshot");
    let v = read_json(resp).await;
    assert_eq!(v["count"], 0, "filter must exclude the score-9 item");
}

#[tokio::test]
async fn search_requires_a_query_and_matches_stored_text() {
    let (app, store, _) = test_app(Some(SECRET));
    store
        .upsert_items(vec![seed_item("https://example.org/a", "Aspirin trial", 9)])
        .await
        .unwrap();

    let resp = app.clone().oneshot(get("/api/search")).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = read_json(resp).await;
    assert_eq!(v["error"], "Search query is required");

    let resp = app
        .clone()
        .oneshot(get("/api/search?q=%20%20"))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "blank query is rejected");

    let resp = app.oneshot(get("/api/search?q=aspirin")).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["success"], true);
    assert_eq!(v["count"], 1);
    assert_eq!(v["results"][0]["title"], "Aspirin trial");
}

#[tokio::test]
async fn bookmark_validates_payload_and_unknown_ids() {
    let (app, store, _) = test_app(Some(SECRET));
    store
        .upsert_items(vec![seed_item("https://example.org/a", "Aspirin trial", 9)])
        .await
        .unwrap();
    let listed = store
        .list_items(&Default::default())
        .await
        .unwrap();
    let id = listed[0].id;

    // Missing bookmarked flag.
    let resp = app
        .clone()
        .oneshot(post_json("/api/bookmark", &json!({ "id": id })))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = read_json(resp).await;
    assert_eq!(v["error"], "Item ID and bookmarked status are required");

    // Malformed id.
    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/bookmark",
            &json!({ "id": "not-a-uuid", "bookmarked": true }),
        ))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Unknown id.
    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/bookmark",
            &json!({ "id": uuid::Uuid::new_v4(), "bookmarked": true }),
        ))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // The real thing.
    let resp = app
        .oneshot(post_json(
            "/api/bookmark",
            &json!({ "id": id, "bookmarked": true }),
        ))
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["success"], true);
    assert_eq!(v["item"]["bookmarked"], true);

    assert!(store.get_item(id).await.unwrap().expect("item exists").bookmarked);
}

#[tokio::test]
async fn stats_reports_totals() {
    let (app, store, _) = test_app(Some(SECRET));
    store
        .upsert_items(vec![
            seed_item("https://example.org/a", "Aspirin trial", 9),
            seed_item("https://example.org/b", "Biomarker study", 6),
        ])
        .await
        .unwrap();

    let resp = app.oneshot(get("/api/stats")).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["success"], true);
    assert_eq!(v["stats"]["total"], 2);
    assert_eq!(v["stats"]["bookmarked"], 0);
    assert_eq!(v["stats"]["byCategory"]["preeclampsia"], 2);
}

#[tokio::test]
async fn prune_is_bearer_gated_and_validates_days() {
    let (app, store, _) = test_app(Some(SECRET));
    store
        .upsert_items(vec![seed_item("https://example.org/a", "Aspirin trial", 9)])
        .await
        .unwrap();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/maintenance/prune")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/maintenance/prune?days=0")
                .header("authorization", format!("Bearer {SECRET}"))
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/maintenance/prune")
                .header("authorization", format!("Bearer {SECRET}"))
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);
    let v = read_json(resp).await;
    assert_eq!(v["success"], true);
    assert_eq!(v["deleted"], 0, "fresh items survive the default retention window");
    assert_eq!(v["days"], 90);
}
