// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod topics;

// Source adapters and the settle-all scrape round
pub mod scrape;

// Model-based relevance scoring
pub mod analyze;

// URL-keyed persistence (Postgres or in-memory)
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::pipeline::{apply_threshold, IngestPipeline, IngestReport};
pub use crate::store::NewsStore;
