//! feedcache: a single-slot persistent cache for ordered feed snapshots.
//!
//! The [`CacheStore`] owns one SQLite connection on a dedicated worker thread
//! and exposes three asynchronous operations: retrieve, insert and delete.

pub mod cli;
pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod report;
pub mod store;

pub use error::{Error, Result};
pub use feed::{CachedFeed, FeedItem};
pub use store::schema::Schema;
pub use store::{CacheStore, StoreOptions, Synchronous};
