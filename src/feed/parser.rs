//! Syndication document parsing.
//!
//! Thin adapter over `feed-rs`, which understands RSS 0.9x/1.0/2.0, Atom and
//! JSON Feed.

use feed_rs::parser;
use thiserror::Error;

use super::types::{FeedDocument, RawEntry};

/// Error raised when a document is not a readable feed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to parse feed: {0}")]
pub struct ParseError(pub String);

/// Parse a feed document body.
///
/// Dates are passed through unconsolidated; see [`crate::feed::normalize`].
pub fn parse_document(body: &str) -> Result<FeedDocument, ParseError> {
    let feed = parser::parse(body.as_bytes()).map_err(|e| ParseError(e.to_string()))?;

    let title = feed.title.and_then(|t| single_line(&t.content));

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| RawEntry {
            title: entry.title.and_then(|t| single_line(&t.content)),
            link: entry.links.first().map(|l| l.href.clone()),
            published: entry.published,
            updated: entry.updated,
        })
        .collect();

    Ok(FeedDocument { title, entries })
}

/// Collapse runs of whitespace, line breaks included, into single spaces.
///
/// Returns `None` for blank text.
pub(crate) fn single_line(text: &str) -> Option<String> {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!line.is_empty()).then_some(line)
}
