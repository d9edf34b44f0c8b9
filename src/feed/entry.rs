//! Entry normalization and new-item filtering.
//!
//! Every entry gets an effective date: the published date when present,
//! otherwise the updated date. Entries with neither cannot be compared with a
//! watermark and are dropped.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use super::types::{RawEntry, UNTITLED};

/// Per-entry error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// The entry has neither a published nor an updated date.
    #[error("entry \"{0}\" has no published or updated date")]
    MissingDate(String),
}

/// A normalized feed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Entry title.
    pub title: String,
    /// Link to the original article.
    pub link: Option<String>,
    /// When the entry was published.
    pub published: Option<DateTime<Utc>>,
    /// When the entry was last updated.
    pub updated: Option<DateTime<Utc>>,
    effective_date: DateTime<Utc>,
}

impl Entry {
    /// Build an entry from its raw form, consolidating the dates.
    pub fn from_raw(raw: RawEntry) -> Result<Self, EntryError> {
        let title = raw.title.unwrap_or_else(|| UNTITLED.to_string());
        let effective_date = raw
            .published
            .or(raw.updated)
            .ok_or_else(|| EntryError::MissingDate(title.clone()))?;

        Ok(Self {
            title,
            link: raw.link,
            published: raw.published,
            updated: raw.updated,
            effective_date,
        })
    }

    /// The date used for filtering and sorting.
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.effective_date
    }
}

/// Normalize raw entries, dropping those without any usable date.
///
/// Input order is preserved.
pub fn normalize(raw: Vec<RawEntry>) -> Vec<Entry> {
    raw.into_iter()
        .filter_map(|entry| match Entry::from_raw(entry) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping entry: {}", e);
                None
            }
        })
        .collect()
}

/// Keep only entries dated strictly after `cutoff`.
///
/// An entry dated exactly at the cutoff was already seen. Input order is preserved.
pub fn filter_new(entries: Vec<Entry>, cutoff: DateTime<Utc>) -> Vec<Entry> {
    entries
        .into_iter()
        .filter(|entry| entry.effective_date > cutoff)
        .collect()
}

/// Sort entries newest first. Entries with equal dates keep their input order.
pub fn sort_newest_first(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.effective_date.cmp(&a.effective_date));
}
