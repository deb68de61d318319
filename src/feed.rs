use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// A single entry of a cached feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: Uuid,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub url: Url,
}

impl FeedItem {
    pub fn new(id: Uuid, url: Url) -> Self {
        FeedItem {
            id,
            description: None,
            location: None,
            url,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Observable state of the cache slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedFeed {
    Empty,
    Found {
        items: Vec<FeedItem>,
        timestamp: DateTime<Utc>,
    },
}

impl CachedFeed {
    pub fn is_empty(&self) -> bool {
        matches!(self, CachedFeed::Empty)
    }
}
