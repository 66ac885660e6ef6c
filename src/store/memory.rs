// src/store/memory.rs
//! In-memory [`NewsStore`] used when no database is configured, and by the
//! integration tests. Single-process only; contents vanish on restart.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{
    InsertNewsItem, InsertOutcome, NewsItem, NewsItemFilters, NewsStore, StoreStats,
    DEFAULT_PAGE_SIZE,
};

#[derive(Default)]
pub struct MemStore {
    items: RwLock<Vec<NewsItem>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(item: &NewsItem, f: &NewsItemFilters) -> bool {
    if let Some(category) = f.category {
        if item.category != category {
            return false;
        }
    }
    if let Some(min) = f.min_score {
        if item.relevance_score < min {
            return false;
        }
    }
    if let Some(bookmarked) = f.bookmarked {
        if item.bookmarked != bookmarked {
            return false;
        }
    }
    if let Some(source) = f.source {
        if item.source != source {
            return false;
        }
    }
    true
}

#[async_trait]
impl NewsStore for MemStore {
    async fn insert_item(&self, item: InsertNewsItem) -> Result<InsertOutcome> {
        let mut items = self.items.write().expect("news store lock poisoned");
        if items.iter().any(|existing| existing.url == item.url) {
            return Ok(InsertOutcome::DuplicateUrl);
        }
        let stored = NewsItem {
            id: Uuid::new_v4(),
            url: item.url,
            title: item.title,
            content: item.content,
            source: item.source,
            ai_summary: item.ai_summary,
            relevance_score: item.relevance_score,
            category: item.category,
            bookmarked: false,
            published_at: item.published_at,
            created_at: Utc::now(),
        };
        items.push(stored.clone());
        Ok(InsertOutcome::Inserted(stored))
    }

    async fn upsert_items(&self, items: Vec<InsertNewsItem>) -> Result<Vec<NewsItem>> {
        let mut inserted = Vec::new();
        for item in items {
            if let InsertOutcome::Inserted(stored) = self.insert_item(item).await? {
                inserted.push(stored);
            }
        }
        Ok(inserted)
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<NewsItem>> {
        let items = self.items.read().expect("news store lock poisoned");
        Ok(items.iter().find(|item| item.id == id).cloned())
    }

    async fn list_items(&self, filters: &NewsItemFilters) -> Result<Vec<NewsItem>> {
        let items = self.items.read().expect("news store lock poisoned");
        let mut hits: Vec<NewsItem> = items
            .iter()
            .filter(|item| matches(item, filters))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = filters.offset.unwrap_or(0).max(0) as usize;
        let limit = filters.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(0) as usize;
        Ok(hits.into_iter().skip(offset).take(limit).collect())
    }

    async fn search_items(&self, query: &str, limit: i64) -> Result<Vec<NewsItem>> {
        let needle = query.to_lowercase();
        let items = self.items.read().expect("news store lock poisoned");
        let mut hits: Vec<NewsItem> = items
            .iter()
            .filter(|item| {
                item.title.to_lowercase().contains(&needle)
                    || item.content.to_lowercase().contains(&needle)
                    || item.ai_summary.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        hits.truncate(limit.max(0) as usize);
        Ok(hits)
    }

    async fn set_bookmarked(&self, id: Uuid, bookmarked: bool) -> Result<Option<NewsItem>> {
        let mut items = self.items.write().expect("news store lock poisoned");
        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            return Ok(None);
        };
        item.bookmarked = bookmarked;
        Ok(Some(item.clone()))
    }

    async fn delete_older_than(&self, days: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(days);
        let mut items = self.items.write().expect("news store lock poisoned");
        let before = items.len();
        items.retain(|item| item.created_at >= cutoff);
        Ok((before - items.len()) as u64)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let items = self.items.read().expect("news store lock poisoned");
        let mut by_category = BTreeMap::new();
        for item in items.iter() {
            *by_category.entry(item.category).or_insert(0) += 1;
        }
        Ok(StoreStats {
            total: items.len() as i64,
            bookmarked: items.iter().filter(|item| item.bookmarked).count() as i64,
            by_category,
        })
    }
}
