//! Feed registry and document types.

use chrono::{DateTime, Utc};

/// Title used when a feed or entry carries none.
pub const UNTITLED: &str = "Untitled";

/// A subscribed feed as stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRecord {
    /// Feed ID.
    pub id: i64,
    /// Feed URL (unique within the registry).
    pub url: String,
    /// Feed title.
    pub title: String,
    /// Watermark: entries dated at or before this instant were already reported.
    ///
    /// Feeds that were never checked report the Unix epoch.
    pub last_check_time: DateTime<Utc>,
}

impl FeedRecord {
    /// Whether the feed has completed at least one check.
    pub fn was_checked(&self) -> bool {
        self.last_check_time > DateTime::<Utc>::UNIX_EPOCH
    }
}

/// New feed for registration.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Feed URL.
    pub url: String,
    /// Feed title.
    pub title: String,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// A parsed feed document, before any normalization.
#[derive(Debug, Clone, Default)]
pub struct FeedDocument {
    /// Feed title, if the document declares one.
    pub title: Option<String>,
    /// Entries in document order.
    pub entries: Vec<RawEntry>,
}

/// A single entry as read from a feed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    /// Entry title.
    pub title: Option<String>,
    /// Link to the original article.
    pub link: Option<String>,
    /// When the entry was published.
    pub published: Option<DateTime<Utc>>,
    /// When the entry was last updated.
    pub updated: Option<DateTime<Utc>>,
}

impl RawEntry {
    /// Create a new raw entry with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Set the link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Set the published date.
    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    /// Set the updated date.
    pub fn with_updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = Some(updated);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_feed() {
        let feed = NewFeed::new("https://example.com/feed.xml", "Test Feed");
        assert_eq!(feed.url, "https://example.com/feed.xml");
        assert_eq!(feed.title, "Test Feed");
    }

    #[test]
    fn test_feed_record_was_checked() {
        let feed = FeedRecord {
            id: 1,
            url: "https://example.com/feed.xml".to_string(),
            title: "Test".to_string(),
            last_check_time: DateTime::<Utc>::UNIX_EPOCH,
        };
        assert!(!feed.was_checked());

        let checked = FeedRecord {
            last_check_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            ..feed
        };
        assert!(checked.was_checked());
    }

    #[test]
    fn test_raw_entry_builder() {
        let published = Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap();
        let entry = RawEntry::new("Post")
            .with_link("https://example.com/post")
            .with_published(published);

        assert_eq!(entry.title.as_deref(), Some("Post"));
        assert_eq!(entry.link.as_deref(), Some("https://example.com/post"));
        assert_eq!(entry.published, Some(published));
        assert!(entry.updated.is_none());
    }
}
