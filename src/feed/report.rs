//! Plain-text rendering of check results and the feed list.

use std::fmt::Write;

use super::checker::CheckResult;
use super::parser::single_line;
use super::types::{FeedRecord, UNTITLED};

/// Render the new items of a check cycle.
///
/// Feeds appear in title order; feeds without new items are skipped.
pub fn format_report(result: &CheckResult) -> String {
    if result.total_new() == 0 {
        return "No new items\n".to_string();
    }

    let mut out = String::new();
    for feed in result.feeds().iter().filter(|f| !f.entries.is_empty()) {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}:", display_title(&feed.title));
        for entry in &feed.entries {
            let _ = writeln!(
                out,
                "- [{}] {}",
                entry.effective_date().format("%Y-%m-%d"),
                display_title(&entry.title)
            );
            let _ = writeln!(out, "  {}", entry.link.as_deref().unwrap_or("(no link)"));
        }
    }
    out
}

/// Titles are rendered on one line each.
fn display_title(title: &str) -> String {
    single_line(title).unwrap_or_else(|| UNTITLED.to_string())
}

/// Render the registered feeds, one `<title>: <url>` line each.
pub fn format_feed_list(feeds: &[FeedRecord]) -> String {
    if feeds.is_empty() {
        return "No feeds\n".to_string();
    }

    feeds
        .iter()
        .map(|f| format!("{}: {}\n", display_title(&f.title), f.url))
        .collect()
}
