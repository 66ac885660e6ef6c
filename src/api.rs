// src/api.rs
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};
use uuid::Uuid;

use crate::pipeline::IngestPipeline;
use crate::scrape::types::NewsSource;
use crate::store::{NewsItemFilters, NewsStore};
use crate::topics::TopicCategory;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestPipeline>,
    pub store: Arc<dyn NewsStore>,
    /// Shared secret for the ingest and maintenance triggers.
    pub cron_secret: Option<String>,
    pub retention_days: i64,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/ingest", get(trigger_ingest))
        .route("/api/items", get(list_items))
        .route("/api/items/{id}", get(get_item))
        .route("/api/search", get(search_items))
        .route("/api/bookmark", post(bookmark))
        .route("/api/stats", get(stats))
        .route("/api/maintenance/prune", post(prune))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Bearer check for the trigger endpoints. A missing server-side secret is a
/// deployment fault and reports 500, never 401.
fn authorize(headers: &HeaderMap, secret: Option<&str>) -> Result<(), Response> {
    let Some(secret) = secret else {
        error!("CRON_SECRET is not configured");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Server configuration error" })),
        )
            .into_response());
    };
    let provided = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if provided != Some(format!("Bearer {secret}").as_str()) {
        warn!("unauthorized trigger attempt");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Unauthorized" })),
        )
            .into_response());
    }
    Ok(())
}

async fn trigger_ingest(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&headers, state.cron_secret.as_deref()) {
        return resp;
    }

    let started = Instant::now();
    match state.pipeline.run().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            error!(error = format!("{e:#}"), "ingest run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": format!("{e:#}"),
                    "duration": started.elapsed().as_millis() as u64,
                })),
            )
                .into_response()
        }
    }
}

#[derive(serde::Deserialize)]
struct ListQuery {
    category: Option<String>,
    #[serde(rename = "minScore")]
    min_score: Option<i32>,
    bookmarked: Option<bool>,
    source: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn list_items(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Response {
    let category = match q.category.as_deref() {
        Some(raw) => match TopicCategory::parse(raw) {
            Some(c) => Some(c),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "Unknown category" })),
                )
                    .into_response()
            }
        },
        None => None,
    };
    let source = match q.source.as_deref() {
        Some(raw) => match NewsSource::parse(raw) {
            Some(s) => Some(s),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "Unknown source" })),
                )
                    .into_response()
            }
        },
        None => None,
    };

    let filters = NewsItemFilters {
        category,
        min_score: q.min_score,
        bookmarked: q.bookmarked,
        source,
        limit: q.limit,
        offset: q.offset,
    };
    match state.store.list_items(&filters).await {
        Ok(items) => Json(json!({
            "success": true,
            "count": items.len(),
            "items": items,
        }))
        .into_response(),
        Err(e) => storage_error(e, "listing items"),
    }
}

async fn get_item(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.store.get_item(id).await {
        Ok(Some(item)) => Json(json!({ "success": true, "item": item })).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Item not found" })),
        )
            .into_response(),
        Err(e) => storage_error(e, "fetching item"),
    }
}

#[derive(serde::Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn search_items(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Response {
    let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Search query is required" })),
        )
            .into_response();
    };

    match state.store.search_items(q, crate::store::DEFAULT_PAGE_SIZE).await {
        Ok(results) => Json(json!({
            "success": true,
            "count": results.len(),
            "results": results,
        }))
        .into_response(),
        Err(e) => storage_error(e, "searching items"),
    }
}

#[derive(serde::Deserialize)]
struct BookmarkReq {
    id: Option<String>,
    bookmarked: Option<bool>,
}

async fn bookmark(State(state): State<AppState>, Json(body): Json<BookmarkReq>) -> Response {
    let id = body.id.as_deref().and_then(|raw| Uuid::parse_str(raw).ok());
    let (Some(id), Some(bookmarked)) = (id, body.bookmarked) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Item ID and bookmarked status are required" })),
        )
            .into_response();
    };

    match state.store.set_bookmarked(id, bookmarked).await {
        Ok(Some(item)) => Json(json!({ "success": true, "item": item })).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Item not found" })),
        )
            .into_response(),
        Err(e) => storage_error(e, "updating bookmark"),
    }
}

async fn stats(State(state): State<AppState>) -> Response {
    match state.store.stats().await {
        Ok(stats) => Json(json!({ "success": true, "stats": stats })).into_response(),
        Err(e) => storage_error(e, "reading stats"),
    }
}

#[derive(serde::Deserialize)]
struct PruneQuery {
    days: Option<i64>,
}

async fn prune(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<PruneQuery>,
) -> Response {
    if let Err(resp) = authorize(&headers, state.cron_secret.as_deref()) {
        return resp;
    }

    let days = q.days.unwrap_or(state.retention_days);
    if days <= 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "days must be positive" })),
        )
            .into_response();
    }

    match state.store.delete_older_than(days).await {
        Ok(deleted) => Json(json!({ "success": true, "deleted": deleted, "days": days })).into_response(),
        Err(e) => storage_error(e, "pruning items"),
    }
}

fn storage_error(e: anyhow::Error, doing: &str) -> Response {
    error!(error = format!("{e:#}"), "storage failure while {doing}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": format!("{e:#}") })),
    )
        .into_response()
}
