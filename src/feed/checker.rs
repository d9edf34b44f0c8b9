//! Check cycle coordinator.
//!
//! One cycle snapshots the registry, runs one task per feed on a bounded pool
//! (fetch, parse, normalize, filter against the feed's own watermark), collects
//! the new entries into a shared aggregate and advances each successful feed's
//! watermark. Per-feed failures are contained in their task; only a failing
//! registry snapshot or a lost worker aborts the cycle.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::entry::{filter_new, normalize, sort_newest_first, Entry};
use super::fetcher::{FeedSource, FetchError};
use super::parser::{parse_document, ParseError};
use super::repository::FeedRegistry;
use super::types::FeedRecord;
use crate::{FeedCheckError, Result};

/// Default number of feeds checked at the same time.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Progress callback, invoked once per feed when its task starts.
pub type ProgressHook = Arc<dyn Fn(&FeedRecord) + Send + Sync>;

/// Stage of a single feed's task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStage {
    Pending,
    Fetching,
    Parsing,
    Filtering,
    Completed,
    Failed,
}

impl fmt::Display for FeedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeedStage::Pending => "pending",
            FeedStage::Fetching => "fetching",
            FeedStage::Parsing => "parsing",
            FeedStage::Filtering => "filtering",
            FeedStage::Completed => "completed",
            FeedStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a feed's task failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedTaskError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl FeedTaskError {
    /// The stage the task was in when it failed.
    pub fn stage(&self) -> FeedStage {
        match self {
            FeedTaskError::Fetch(_) => FeedStage::Fetching,
            FeedTaskError::Parse(_) => FeedStage::Parsing,
        }
    }
}

/// A feed that could not be checked this cycle.
#[derive(Debug, Clone)]
pub struct FeedFailure {
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub stage: FeedStage,
    pub error: FeedTaskError,
}

/// Aggregate key. Orders feeds by title, then by ID for feeds sharing a title.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct FeedKey {
    title: String,
    feed_id: i64,
}

/// New entries of one feed, newest first.
#[derive(Debug, Clone)]
pub struct FeedEntries {
    pub feed_id: i64,
    pub title: String,
    pub entries: Vec<Entry>,
}

/// New entries of every successfully checked feed, ordered by feed title.
///
/// Feeds whose task failed are absent; feeds without new entries are present
/// with an empty list.
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    feeds: Vec<FeedEntries>,
}

impl CheckResult {
    /// Feed groups in report order.
    pub fn feeds(&self) -> &[FeedEntries] {
        &self.feeds
    }

    /// Entries of the feed with the given ID.
    pub fn entries_for(&self, feed_id: i64) -> Option<&[Entry]> {
        self.feeds
            .iter()
            .find(|f| f.feed_id == feed_id)
            .map(|f| f.entries.as_slice())
    }

    /// Total number of new entries across all feeds.
    pub fn total_new(&self) -> usize {
        self.feeds.iter().map(|f| f.entries.len()).sum()
    }
}

/// Diagnostics for one cycle.
#[derive(Debug, Clone)]
pub struct CheckSummary {
    /// Cycle start; successful feeds get this as their new watermark.
    pub started_at: DateTime<Utc>,
    /// Number of feeds dispatched.
    pub attempted: usize,
    /// Number of feeds whose task completed.
    pub completed: usize,
    /// Feeds whose task failed.
    pub failures: Vec<FeedFailure>,
    /// Feeds whose watermark could not be persisted.
    pub watermark_failures: usize,
}

/// Outcome of a check cycle.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub result: CheckResult,
    pub summary: CheckSummary,
}

/// Shared, write-once-per-feed aggregate filled by concurrent tasks.
#[derive(Default)]
struct Aggregate {
    inner: Mutex<BTreeMap<FeedKey, Vec<Entry>>>,
}

impl Aggregate {
    fn insert(&self, feed: &FeedRecord, entries: Vec<Entry>) {
        let key = FeedKey {
            title: feed.title.clone(),
            feed_id: feed.id,
        };
        // A poisoned lock only means another task panicked mid-insert;
        // that panic already fails the cycle at the join.
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(key, entries);
    }

    fn into_result(self) -> CheckResult {
        let map = self.inner.into_inner().unwrap_or_else(|e| e.into_inner());
        CheckResult {
            feeds: map
                .into_iter()
                .map(|(key, entries)| FeedEntries {
                    feed_id: key.feed_id,
                    title: key.title,
                    entries,
                })
                .collect(),
        }
    }
}

/// What a finished task reports back to the coordinator.
enum TaskOutcome {
    Completed { watermark_saved: bool },
    Failed(FeedFailure),
}

/// Runs check cycles over a registry and a feed source.
pub struct FeedChecker {
    registry: Arc<dyn FeedRegistry>,
    source: Arc<dyn FeedSource>,
    max_concurrency: usize,
    progress: Option<ProgressHook>,
}

impl FeedChecker {
    /// Create a checker with the default concurrency limit.
    pub fn new(registry: Arc<dyn FeedRegistry>, source: Arc<dyn FeedSource>) -> Self {
        Self {
            registry,
            source,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            progress: None,
        }
    }

    /// Set the maximum number of feeds checked at the same time (at least 1).
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Set a callback invoked once per feed, when its task starts.
    pub fn with_progress(mut self, hook: impl Fn(&FeedRecord) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(hook));
        self
    }

    /// Get the concurrency limit.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run one check cycle over every registered feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read, or if a worker task is
    /// lost. Per-feed fetch and parse failures are reported in the summary.
    pub async fn run(&self) -> Result<CheckReport> {
        let feeds = self.registry.list_feeds().await?;
        let started_at = Utc::now();
        let attempted = feeds.len();

        info!(
            "Checking {} feed(s) with concurrency {}",
            attempted, self.max_concurrency
        );

        let aggregate = Arc::new(Aggregate::default());
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for feed in feeds {
            debug!("Feed {} ({}): {}", feed.id, feed.url, FeedStage::Pending);

            let registry = Arc::clone(&self.registry);
            let source = Arc::clone(&self.source);
            let aggregate = Arc::clone(&aggregate);
            let permits = Arc::clone(&permits);
            let progress = self.progress.clone();

            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| FeedCheckError::Worker(e.to_string()))?;
                if let Some(progress) = progress {
                    progress(&feed);
                }
                Ok::<_, FeedCheckError>(
                    check_feed(feed, started_at, registry, source, aggregate).await,
                )
            });
        }

        let mut completed = 0;
        let mut watermark_failures = 0;
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome?,
                Err(e) => {
                    error!("Check worker lost: {}", e);
                    tasks.abort_all();
                    return Err(FeedCheckError::Worker(e.to_string()));
                }
            };
            match outcome {
                TaskOutcome::Completed { watermark_saved } => {
                    completed += 1;
                    if !watermark_saved {
                        watermark_failures += 1;
                    }
                }
                TaskOutcome::Failed(failure) => failures.push(failure),
            }
        }

        // Every task has finished, so this is the last reference.
        let aggregate = Arc::try_unwrap(aggregate)
            .map_err(|_| FeedCheckError::Worker("aggregate still shared after join".into()))?;
        let result = aggregate.into_result();

        info!(
            "Check finished: {} of {} feed(s) completed, {} new item(s)",
            completed,
            attempted,
            result.total_new()
        );

        Ok(CheckReport {
            result,
            summary: CheckSummary {
                started_at,
                attempted,
                completed,
                failures,
                watermark_failures,
            },
        })
    }
}

/// Check a single feed. The watermark is advanced last, and only on success.
async fn check_feed(
    feed: FeedRecord,
    started_at: DateTime<Utc>,
    registry: Arc<dyn FeedRegistry>,
    source: Arc<dyn FeedSource>,
    aggregate: Arc<Aggregate>,
) -> TaskOutcome {
    let entries = match fetch_new_entries(&feed, source.as_ref()).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to check feed {} ({}): {}", feed.title, feed.url, e);
            debug!("Feed {}: {}", feed.id, FeedStage::Failed);
            return TaskOutcome::Failed(FeedFailure {
                feed_id: feed.id,
                stage: e.stage(),
                title: feed.title,
                url: feed.url,
                error: e,
            });
        }
    };

    debug!("Feed {}: {} new item(s)", feed.id, entries.len());
    aggregate.insert(&feed, entries);

    let watermark_saved = match registry.update_last_check(feed.id, started_at).await {
        Ok(()) => true,
        Err(e) => {
            // Items stay in this report; they may be reported again next cycle.
            error!("Failed to update last check time of {}: {}", feed.title, e);
            false
        }
    };

    debug!("Feed {}: {}", feed.id, FeedStage::Completed);
    TaskOutcome::Completed { watermark_saved }
}

async fn fetch_new_entries(
    feed: &FeedRecord,
    source: &dyn FeedSource,
) -> std::result::Result<Vec<Entry>, FeedTaskError> {
    debug!("Feed {}: {}", feed.id, FeedStage::Fetching);
    let body = source.fetch(&feed.url).await?;

    debug!("Feed {}: {}", feed.id, FeedStage::Parsing);
    let document = parse_document(&body)?;

    debug!("Feed {}: {}", feed.id, FeedStage::Filtering);
    let mut entries = filter_new(normalize(document.entries), feed.last_check_time);
    sort_newest_first(&mut entries);
    Ok(entries)
}
