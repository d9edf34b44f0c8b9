//! Feed subscription and checking.
//!
//! - [`FeedRepository`] persists subscriptions and their last-check watermark.
//! - [`FeedChecker`] runs a check cycle over every subscribed feed.
//! - [`FeedService`] adds and removes subscriptions.
//! - [`format_report`] renders the new items of a cycle.

pub mod checker;
pub mod entry;
pub mod fetcher;
pub mod parser;
pub mod report;
pub mod repository;
pub mod service;
pub mod types;

pub use checker::{
    CheckReport, CheckResult, CheckSummary, FeedChecker, FeedEntries, FeedFailure, FeedStage,
    FeedTaskError, ProgressHook, DEFAULT_MAX_CONCURRENCY,
};
pub use entry::{filter_new, normalize, sort_newest_first, Entry, EntryError};
pub use fetcher::{validate_url, FeedSource, FetchError, HttpFetcher};
pub use parser::{parse_document, ParseError};
pub use report::{format_feed_list, format_report};
pub use repository::{FeedRegistry, FeedRepository};
pub use service::FeedService;
pub use types::{FeedDocument, FeedRecord, NewFeed, RawEntry, UNTITLED};
