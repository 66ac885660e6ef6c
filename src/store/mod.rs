// src/store/mod.rs
//! Persistence for curated news items.
//!
//! The store is URL-keyed: inserting an item whose URL is already present is
//! a silent no-op, which makes ingest runs idempotent. Two backends implement
//! the same trait, Postgres for deployments and an in-memory store for local
//! runs and tests.

pub mod memory;
pub mod postgres;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analyze::EnrichedItem;
use crate::scrape::types::NewsSource;
use crate::topics::TopicCategory;

/// Default page size for listings and searches.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// A persisted curated item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub content: String,
    pub source: NewsSource,
    pub ai_summary: String,
    pub relevance_score: i32,
    pub category: TopicCategory,
    pub bookmarked: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload. The store assigns `id` and `created_at` and starts items
/// un-bookmarked.
#[derive(Debug, Clone)]
pub struct InsertNewsItem {
    pub url: String,
    pub title: String,
    pub content: String,
    pub source: NewsSource,
    pub ai_summary: String,
    pub relevance_score: i32,
    pub category: TopicCategory,
    pub published_at: Option<DateTime<Utc>>,
}

impl From<EnrichedItem> for InsertNewsItem {
    fn from(e: EnrichedItem) -> Self {
        Self {
            url: e.raw.url,
            title: e.raw.title,
            content: e.raw.content,
            source: e.raw.source,
            ai_summary: e.analysis.summary,
            relevance_score: e.analysis.score,
            category: e.analysis.category,
            published_at: e.raw.published_at,
        }
    }
}

/// Result of a single-item insert.
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Inserted(NewsItem),
    /// The URL is already stored; nothing was written.
    DuplicateUrl,
}

/// Optional listing filters, combined with AND.
#[derive(Debug, Clone, Default)]
pub struct NewsItemFilters {
    pub category: Option<TopicCategory>,
    pub min_score: Option<i32>,
    pub bookmarked: Option<bool>,
    pub source: Option<NewsSource>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Aggregate counts for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total: i64,
    pub bookmarked: i64,
    #[serde(rename = "byCategory")]
    pub by_category: BTreeMap<TopicCategory, i64>,
}

#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Insert one item; duplicate URLs report [`InsertOutcome::DuplicateUrl`]
    /// instead of erroring.
    async fn insert_item(&self, item: InsertNewsItem) -> Result<InsertOutcome>;

    /// Insert a batch, skipping URLs that already exist (including duplicates
    /// within the batch itself). Returns only the rows actually written.
    async fn upsert_items(&self, items: Vec<InsertNewsItem>) -> Result<Vec<NewsItem>>;

    async fn get_item(&self, id: Uuid) -> Result<Option<NewsItem>>;

    /// Newest-first listing with optional filters and pagination.
    async fn list_items(&self, filters: &NewsItemFilters) -> Result<Vec<NewsItem>>;

    /// Case-insensitive substring search over title, content, and summary,
    /// newest first.
    async fn search_items(&self, query: &str, limit: i64) -> Result<Vec<NewsItem>>;

    /// Returns the updated item, or `None` if the id is unknown.
    async fn set_bookmarked(&self, id: Uuid, bookmarked: bool) -> Result<Option<NewsItem>>;

    /// Delete items older than `days` (by `created_at`); returns how many
    /// rows went away.
    async fn delete_older_than(&self, days: i64) -> Result<u64>;

    async fn stats(&self) -> Result<StoreStats>;
}
