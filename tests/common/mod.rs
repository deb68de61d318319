#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use feedcache::{CacheStore, CachedFeed, FeedItem, Result, Schema};
use tempfile::TempDir;
use url::Url;
use uuid::Uuid;

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Fixture {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("feed.store")
    }

    pub fn open(&self) -> CacheStore {
        CacheStore::open(self.store_path(), &Schema::bundled().unwrap()).expect("open store")
    }

    /// A second connection to the same file, for setting up failures.
    pub fn raw(&self) -> rusqlite::Connection {
        rusqlite::Connection::open(self.store_path()).expect("raw connection")
    }
}

pub fn unique_item() -> FeedItem {
    let id = Uuid::new_v4();
    FeedItem::new(id, Url::parse(&format!("https://example.com/images/{id}")).unwrap())
        .with_description("a description")
        .with_location("a location")
}

pub fn unique_feed() -> Vec<FeedItem> {
    vec![unique_item(), unique_item()]
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn retrieve(store: &CacheStore) -> Result<CachedFeed> {
    let (tx, rx) = mpsc::channel();
    store.retrieve(move |result| tx.send(result).unwrap());
    rx.recv_timeout(COMPLETION_TIMEOUT).expect("retrieve did not complete")
}

pub fn insert(store: &CacheStore, items: Vec<FeedItem>, timestamp: DateTime<Utc>) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    store.insert(items, timestamp, move |result| tx.send(result).unwrap());
    rx.recv_timeout(COMPLETION_TIMEOUT).expect("insert did not complete")
}

pub fn delete(store: &CacheStore) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    store.delete(move |result| tx.send(result).unwrap());
    rx.recv_timeout(COMPLETION_TIMEOUT).expect("delete did not complete")
}

pub fn found(items: Vec<FeedItem>, timestamp: DateTime<Utc>) -> CachedFeed {
    CachedFeed::Found { items, timestamp }
}

pub fn count_rows(path: &Path, table: &str) -> i64 {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}
