//! JSON output for the cached feed.
//!
//! An empty cache renders as `{"timestamp": null, "items": []}` so scripts
//! can treat both states the same way.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::feed::{CachedFeed, FeedItem};

#[derive(Serialize)]
struct FeedView<'a> {
    timestamp: Option<&'a DateTime<Utc>>,
    items: &'a [FeedItem],
}

pub fn render(feed: &CachedFeed) -> String {
    let view = match feed {
        CachedFeed::Empty => FeedView {
            timestamp: None,
            items: &[],
        },
        CachedFeed::Found { items, timestamp } => FeedView {
            timestamp: Some(timestamp),
            items,
        },
    };

    serde_json::to_string_pretty(&view).unwrap_or_else(|_| String::from("{}"))
}
