//! Feed subscription service.
//!
//! Registry management on top of [`FeedRepository`]: subscribing fetches the
//! feed once to validate it and discover its title.

use tracing::info;

use super::fetcher::{validate_url, FeedSource};
use super::parser::parse_document;
use super::repository::FeedRepository;
use super::types::{FeedRecord, NewFeed};
use crate::db::Database;
use crate::{FeedCheckError, Result};

/// Service for feed subscriptions.
pub struct FeedService<'a> {
    db: &'a Database,
    source: &'a dyn FeedSource,
}

impl<'a> FeedService<'a> {
    /// Create a new FeedService over a database and a feed source.
    pub fn new(db: &'a Database, source: &'a dyn FeedSource) -> Self {
        Self { db, source }
    }

    /// Subscribe to a feed.
    ///
    /// The new feed has never been checked, so its first check reports every
    /// dated entry.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The URL is empty or not an http(s) URL
    /// - The feed is already registered
    /// - The feed cannot be fetched or parsed
    pub async fn add_feed(&self, url: &str) -> Result<FeedRecord> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FeedCheckError::Validation("URL is empty".to_string()));
        }
        validate_url(url).map_err(|e| FeedCheckError::Validation(e.to_string()))?;

        let repo = FeedRepository::new(self.db.pool());
        if repo.get_by_url(url).await?.is_some() {
            return Err(FeedCheckError::Duplicate(url.to_string()));
        }

        let body = self
            .source
            .fetch(url)
            .await
            .map_err(|e| FeedCheckError::FetchFailed(format!("{}: {}", url, e)))?;
        let document =
            parse_document(&body).map_err(|e| FeedCheckError::FetchFailed(format!("{}: {}", url, e)))?;

        let title = document.title.unwrap_or_else(|| url.to_string());
        let feed = repo.create(&NewFeed::new(url, title)).await?;

        info!("Added feed {} ({})", feed.title, feed.url);
        Ok(feed)
    }

    /// Unsubscribe from a feed.
    ///
    /// # Errors
    ///
    /// Returns [`FeedCheckError::NotFound`] if no feed has this URL.
    pub async fn remove_feed(&self, url: &str) -> Result<()> {
        let url = url.trim();
        let repo = FeedRepository::new(self.db.pool());

        if !repo.delete_by_url(url).await? {
            return Err(FeedCheckError::NotFound(format!("feed {}", url)));
        }

        info!("Removed feed {}", url);
        Ok(())
    }

    /// List all subscribed feeds in registration order.
    pub async fn list_feeds(&self) -> Result<Vec<FeedRecord>> {
        FeedRepository::new(self.db.pool()).list_all().await
    }
}
