//! Test helpers for check cycle integration tests.
//!
//! Provides an in-process [`FeedSource`] with per-URL canned responses and an
//! in-flight counter, plus small builders for RSS documents.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use feedcheck::feed::NewFeed;
use feedcheck::{Database, FeedRecord, FeedRepository, FeedSource, FetchError};

/// Fake feed source serving canned responses.
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<HashMap<String, Result<String, FetchError>>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every fetch for `delay` so overlapping fetches can be observed.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn serve(&self, url: &str, body: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(body.into()));
    }

    pub fn fail(&self, url: &str, error: FetchError) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(error));
    }

    /// Highest number of fetches observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self
            .responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(Err(FetchError::Status(404)));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

/// Midnight UTC on the given date.
pub fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// Build an RSS 2.0 document from `(title, published)` pairs.
pub fn rss(title: &str, items: &[(&str, DateTime<Utc>)]) -> String {
    let items: String = items
        .iter()
        .map(|(item, published)| {
            format!(
                "<item><title>{}</title><link>https://example.com/{}</link><pubDate>{}</pubDate></item>\n",
                item,
                item.replace(' ', "-"),
                published.to_rfc2822()
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\"?>\n<rss version=\"2.0\"><channel><title>{}</title>\n{}</channel></rss>",
        title, items
    )
}

pub async fn setup_db() -> Database {
    Database::open_in_memory().await.unwrap()
}

/// Register a feed, optionally with a watermark already set.
pub async fn register(
    db: &Database,
    url: &str,
    title: &str,
    last_check: Option<DateTime<Utc>>,
) -> FeedRecord {
    let repo = FeedRepository::new(db.pool());
    let feed = repo.create(&NewFeed::new(url, title)).await.unwrap();
    if let Some(at) = last_check {
        repo.set_last_check(feed.id, at).await.unwrap();
    }
    repo.get_by_id(feed.id).await.unwrap().unwrap()
}

pub async fn reload(db: &Database, id: i64) -> FeedRecord {
    FeedRepository::new(db.pool())
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap()
}
