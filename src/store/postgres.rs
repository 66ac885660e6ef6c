// src/store/postgres.rs
//! Postgres-backed [`NewsStore`]. Schema lives in `migrations/` and is applied
//! at startup. Uniqueness on `url` is enforced by the database, so concurrent
//! ingest runs cannot double-insert.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    InsertNewsItem, InsertOutcome, NewsItem, NewsItemFilters, NewsStore, StoreStats,
    DEFAULT_PAGE_SIZE,
};
use crate::scrape::types::NewsSource;
use crate::topics::TopicCategory;

pub struct PgStore {
    pool: PgPool,
}

/// A row from the news_items table. Enum columns come back as text and are
/// parsed on the way out.
#[derive(Debug, sqlx::FromRow)]
struct NewsItemRow {
    id: Uuid,
    url: String,
    title: String,
    content: String,
    source: String,
    ai_summary: String,
    relevance_score: i32,
    category: String,
    bookmarked: bool,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NewsItemRow> for NewsItem {
    type Error = anyhow::Error;

    fn try_from(row: NewsItemRow) -> Result<Self> {
        let source = NewsSource::parse(&row.source)
            .with_context(|| format!("unknown source in row {}: {}", row.id, row.source))?;
        let category = TopicCategory::parse(&row.category)
            .with_context(|| format!("unknown category in row {}: {}", row.id, row.category))?;
        Ok(NewsItem {
            id: row.id,
            url: row.url,
            title: row.title,
            content: row.content,
            source,
            ai_summary: row.ai_summary,
            relevance_score: row.relevance_score,
            category,
            bookmarked: row.bookmarked,
            published_at: row.published_at,
            created_at: row.created_at,
        })
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .context("connecting to Postgres")?;
        Ok(Self { pool })
    }

    /// Apply the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("running database migrations")?;
        Ok(())
    }
}

#[async_trait]
impl NewsStore for PgStore {
    async fn insert_item(&self, item: InsertNewsItem) -> Result<InsertOutcome> {
        let row = sqlx::query_as::<_, NewsItemRow>(
            r#"
            INSERT INTO news_items
                (id, url, title, content, source, ai_summary, relevance_score, category, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (url) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&item.url)
        .bind(&item.title)
        .bind(&item.content)
        .bind(item.source.as_str())
        .bind(&item.ai_summary)
        .bind(item.relevance_score)
        .bind(item.category.as_str())
        .bind(item.published_at)
        .fetch_optional(&self.pool)
        .await
        .context("inserting news item")?;

        match row {
            Some(row) => Ok(InsertOutcome::Inserted(row.try_into()?)),
            None => Ok(InsertOutcome::DuplicateUrl),
        }
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
        let row = sqlx::query_as::<_, NewsItemRow>("SELECT * FROM news_items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("fetching news item")?;
        row.map(NewsItem::try_from).transpose()
    }

    async fn list_items(&self, filters: &NewsItemFilters) -> Result<Vec<NewsItem>> {
        let rows = sqlx::query_as::<_, NewsItemRow>(
            r#"
            SELECT * FROM news_items
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::int IS NULL OR relevance_score >= $2)
              AND ($3::boolean IS NULL OR bookmarked = $3)
              AND ($4::text IS NULL OR source = $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filters.category.map(|c| c.as_str()))
        .bind(filters.min_score)
        .bind(filters.bookmarked)
        .bind(filters.source.map(|s| s.as_str()))
        .bind(filters.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(0))
        .bind(filters.offset.unwrap_or(0).max(0))
        .fetch_all(&self.pool)
        .await
        .context("listing news items")?;

        rows.into_iter().map(NewsItem::try_from).collect()
    }

    async fn search_items(&self, query: &str, limit: i64) -> Result<Vec<NewsItem>> {
        let pattern = format!("%{query}%");
        let rows = sqlx::query_as::<_, NewsItemRow>(
            r#"
            SELECT * FROM news_items
            WHERE title ILIKE $1 OR content ILIKE $1 OR ai_summary ILIKE $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(&pattern)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await
        .context("searching news items")?;

        rows.into_iter().map(NewsItem::try_from).collect()
    }

    async fn set_bookmarked(&self, id: Uuid, bookmarked: bool) -> Result<Option<NewsItem>> {
        let row = sqlx::query_as::<_, NewsItemRow>(
            "UPDATE news_items SET bookmarked = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(bookmarked)
        .fetch_optional(&self.pool)
        .await
        .context("updating bookmark")?;
        row.map(NewsItem::try_from).transpose()
    }

    async fn delete_older_than(&self, days: i64) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let result = sqlx::query("DELETE FROM news_items WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("deleting old news items")?;
        Ok(result.rows_affected())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news_items")
            .fetch_one(&self.pool)
            .await
            .context("counting news items")?;
        let bookmarked: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM news_items WHERE bookmarked")
                .fetch_one(&self.pool)
                .await
                .context("counting bookmarks")?;
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT category, COUNT(*) FROM news_items GROUP BY category")
                .fetch_all(&self.pool)
                .await
                .context("counting categories")?;

        let by_category = rows
            .into_iter()
            .filter_map(|(category, count)| {
                TopicCategory::parse(&category).map(|c| (c, count))
            })
            .collect();

        Ok(StoreStats {
            total,
            bookmarked,
            by_category,
        })
    }
}
