// src/metrics.rs
//! Prometheus exposition for the curation pipeline.
//!
//! Stage modules record their own series where the work happens (`scrape_*`
//! in the aggregator, `analyze_*` in the scorer, `ingest_*` in the
//! orchestrator). This module owns the recorder, the static configuration
//! gauges, and the `/metrics` route merged into the main router.

use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::IngestSettings;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide recorder and publish the static tuning knobs
    /// as gauges. Must run once, before the first ingest.
    pub fn init(settings: &IngestSettings) -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");

        gauge!("ingest_min_relevance_score").set(settings.min_relevance_score as f64);
        gauge!("ingest_retention_days").set(settings.retention_days as f64);

        Self { handle }
    }

    /// Router exposing `/metrics` in the Prometheus text format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
