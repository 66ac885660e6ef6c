//! Perinatal News Curator — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the ingest pipeline, the store, and
//! the curated-items API.
//!
//! See `README.md` for quickstart and configuration.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use shuttle_runtime::CustomError;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use perinatal_news_curator::analyze::ai::{AiAnalyzer, OpenAiAnalyzer};
use perinatal_news_curator::api::{create_router, AppState};
use perinatal_news_curator::config::AppConfig;
use perinatal_news_curator::metrics::Metrics;
use perinatal_news_curator::pipeline::IngestPipeline;
use perinatal_news_curator::scrape::bluesky::BlueskyScraper;
use perinatal_news_curator::scrape::linkedin::LinkedinScraper;
use perinatal_news_curator::scrape::news_api::NewsApiScraper;
use perinatal_news_curator::scrape::reddit::RedditScraper;
use perinatal_news_curator::scrape::rss::RssScraper;
use perinatal_news_curator::scrape::twitter::TwitterScraper;
use perinatal_news_curator::scrape::types::Scraper;
use perinatal_news_curator::store::memory::MemStore;
use perinatal_news_curator::store::postgres::PgStore;
use perinatal_news_curator::store::NewsStore;
use perinatal_news_curator::topics::Topics;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - CURATOR_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("CURATOR_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("perinatal_news_curator=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let config = AppConfig::from_env();
    let topics = Topics::load_default().map_err(CustomError::from)?;

    let store: Arc<dyn NewsStore> = match config.database_url.as_deref() {
        Some(url) => {
            let pg = PgStore::connect(url).await.map_err(CustomError::from)?;
            pg.migrate().await.map_err(CustomError::from)?;
            info!("using Postgres store");
            Arc::new(pg)
        }
        None => {
            warn!("DATABASE_URL is not set; curated items will not survive restarts");
            Arc::new(MemStore::new())
        }
    };

    // Invocation order is also the reporting order of the source breakdown.
    let scrapers: Vec<Arc<dyn Scraper>> = vec![
        Arc::new(NewsApiScraper::new(config.news_api_key.clone(), &topics)),
        Arc::new(RedditScraper::new(&topics)),
        Arc::new(LinkedinScraper::new(
            config.google_cse_api_key.clone(),
            config.google_cse_id.clone(),
            topics.clone(),
        )),
        Arc::new(TwitterScraper::new(config.apify_api_key.clone(), &topics)),
        Arc::new(RssScraper::new()),
        Arc::new(BlueskyScraper::new()),
    ];

    let analyzer: Arc<dyn AiAnalyzer> =
        Arc::new(OpenAiAnalyzer::new(config.openai_api_key.clone(), None));
    let pipeline = IngestPipeline::new(
        scrapers,
        analyzer,
        Arc::clone(&store),
        config.ingest.clone(),
    );

    let metrics = Metrics::init(&config.ingest);

    let state = AppState {
        pipeline: Arc::new(pipeline),
        store,
        cron_secret: config.cron_secret.clone(),
        retention_days: config.ingest.retention_days,
    };
    let router = create_router(state).merge(metrics.router());

    Ok(router.into())
}
