// src/config.rs
//! Environment-driven configuration.
//!
//! All credentials are optional at startup: a scraper whose key is missing
//! reports a configuration error at run time instead of failing the boot.
//! Tuning knobs fall back to the production defaults when unset or unparsable.

use std::env;
use std::time::Duration;

/// Credentials and connection strings, resolved once at startup.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub news_api_key: Option<String>,
    pub google_cse_api_key: Option<String>,
    pub google_cse_id: Option<String>,
    pub apify_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Shared secret required by the ingest trigger and maintenance routes.
    pub cron_secret: Option<String>,
    pub database_url: Option<String>,
    pub ingest: IngestSettings,
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Items scoring below this are discarded before persistence.
    pub min_relevance_score: i32,
    /// Model calls issued concurrently per batch.
    pub batch_size: usize,
    /// Pause between scoring batches (not applied after the last batch).
    pub batch_delay: Duration,
    /// Age cutoff for the maintenance prune, in days.
    pub retention_days: i64,
}

impl Default for IngestSettings {
    fn default() -> Self {
        IngestSettings {
            min_relevance_score: 4,
            batch_size: 5,
            batch_delay: Duration::from_millis(1000),
            retention_days: 90,
        }
    }
}

impl IngestSettings {
    pub fn from_env() -> Self {
        let defaults = IngestSettings::default();
        IngestSettings {
            min_relevance_score: parsed_var("MIN_RELEVANCE_SCORE")
                .map(|v: i32| v.clamp(0, 10))
                .unwrap_or(defaults.min_relevance_score),
            batch_size: parsed_var("ANALYZE_BATCH_SIZE")
                .map(|v: usize| v.max(1))
                .unwrap_or(defaults.batch_size),
            batch_delay: parsed_var("ANALYZE_BATCH_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.batch_delay),
            retention_days: parsed_var("RETENTION_DAYS")
                .map(|v: i64| v.max(1))
                .unwrap_or(defaults.retention_days),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            news_api_key: non_empty_var("NEWS_API_KEY"),
            google_cse_api_key: non_empty_var("GOOGLE_CSE_API_KEY"),
            google_cse_id: non_empty_var("GOOGLE_CSE_ID"),
            apify_api_key: non_empty_var("APIFY_API_KEY"),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            cron_secret: non_empty_var("CRON_SECRET"),
            database_url: non_empty_var("DATABASE_URL"),
            ingest: IngestSettings::from_env(),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
