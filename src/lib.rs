//! feedcheck - concurrent RSS/Atom feed checker
//!
//! Keeps a registry of subscribed feeds in SQLite, checks them concurrently
//! and reports the entries published since each feed's previous check.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;

pub use config::Config;
pub use db::Database;
pub use error::{FeedCheckError, Result};
pub use feed::{
    format_feed_list, format_report, CheckReport, CheckResult, Entry, FeedChecker, FeedRecord,
    FeedRegistry, FeedRepository, FeedService, FeedSource, FetchError, HttpFetcher,
};
