//! Feed registry backed by SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{FeedRecord, NewFeed};
use crate::db::DbPool;
use crate::{FeedCheckError, Result};

/// Registry of subscribed feeds, as seen by the check cycle.
#[async_trait]
pub trait FeedRegistry: Send + Sync {
    /// Snapshot of all subscribed feeds, in registration order.
    async fn list_feeds(&self) -> Result<Vec<FeedRecord>>;

    /// Advance the watermark of one feed.
    async fn update_last_check(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()>;
}

/// Row type for a feed from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: i64,
    url: String,
    title: String,
    last_check: Option<String>,
}

impl From<FeedRow> for FeedRecord {
    fn from(row: FeedRow) -> Self {
        FeedRecord {
            id: row.id,
            url: row.url,
            title: row.title,
            last_check_time: row
                .last_check
                .and_then(|s| parse_datetime(&s))
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        }
    }
}

/// Repository for feed records.
#[derive(Debug, Clone)]
pub struct FeedRepository {
    pool: DbPool,
}

impl FeedRepository {
    /// Create a new repository instance.
    pub fn new(pool: &DbPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Register a new feed.
    ///
    /// Returns [`FeedCheckError::Duplicate`] if the URL is already registered.
    pub async fn create(&self, feed: &NewFeed) -> Result<FeedRecord> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO feeds (url, title)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(&feed.url)
        .bind(&feed.title)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return FeedCheckError::Duplicate(feed.url.clone());
                }
            }
            FeedCheckError::from(e)
        })?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| FeedCheckError::NotFound("feed".into()))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FeedRecord>> {
        let row = sqlx::query_as::<_, FeedRow>(
            "SELECT id, url, title, last_check FROM feeds WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FeedRecord::from))
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<FeedRecord>> {
        let row = sqlx::query_as::<_, FeedRow>(
            "SELECT id, url, title, last_check FROM feeds WHERE url = $1",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FeedRecord::from))
    }

    /// List all feeds (ordered by registration order).
    pub async fn list_all(&self) -> Result<Vec<FeedRecord>> {
        let rows = sqlx::query_as::<_, FeedRow>(
            "SELECT id, url, title, last_check FROM feeds ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FeedRecord::from).collect())
    }

    /// Set the last check time of a feed.
    ///
    /// Returns false if no such feed exists.
    pub async fn set_last_check(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("UPDATE feeds SET last_check = $1 WHERE id = $2")
            .bind(at.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a feed by URL.
    ///
    /// Returns false if no such feed exists.
    pub async fn delete_by_url(&self, url: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feeds WHERE url = $1")
            .bind(url)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all feeds.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feeds")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl FeedRegistry for FeedRepository {
    async fn list_feeds(&self) -> Result<Vec<FeedRecord>> {
        self.list_all().await
    }

    async fn update_last_check(&self, feed_id: i64, at: DateTime<Utc>) -> Result<()> {
        if self.set_last_check(feed_id, at).await? {
            Ok(())
        } else {
            Err(FeedCheckError::NotFound(format!("feed {}", feed_id)))
        }
    }
}

/// Parse a stored timestamp (RFC3339, or SQLite's `YYYY-MM-DD HH:MM:SS` in UTC).
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    None
}
