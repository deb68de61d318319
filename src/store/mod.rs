//! Single-slot SQLite feed cache.
//!
//! Persists one feed snapshot with two tables:
//! - feed_cache: id, slot, timestamp_secs, timestamp_nanos
//! - feed_items: cache_id, position, item_id, description, location, url
//!
//! The connection lives on one worker thread. Every operation is sent to it
//! over a channel and runs to completion before the next one starts, in
//! the order the operations were submitted. Results are delivered to the
//! caller's completion on the worker thread.

pub mod backend;
pub mod mapper;
pub mod schema;

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::feed::{CachedFeed, FeedItem};
use schema::Schema;

const WORKER_NAME: &str = "feedcache-worker";

/// SQLite `synchronous` level used for the store's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Synchronous {
    #[default]
    Full,
    Normal,
}

impl Synchronous {
    pub fn as_pragma(self) -> &'static str {
        match self {
            Synchronous::Full => "FULL",
            Synchronous::Normal => "NORMAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// How long the backend waits on a lock held by another connection.
    pub busy_timeout: Duration,
    pub synchronous: Synchronous,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            busy_timeout: Duration::from_secs(5),
            synchronous: Synchronous::Full,
        }
    }
}

type Completion<T> = Box<dyn FnOnce(Result<T>) + Send + 'static>;

enum Command {
    Retrieve(Completion<CachedFeed>),
    Insert {
        items: Vec<FeedItem>,
        timestamp: DateTime<Utc>,
        completion: Completion<()>,
    },
    Delete(Completion<()>),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Retrieve(_) => "retrieve",
            Command::Insert { .. } => "insert",
            Command::Delete(_) => "delete",
        }
    }

    fn fail(self, error: Error) {
        match self {
            Command::Retrieve(completion) => completion(Err(error)),
            Command::Insert { completion, .. } | Command::Delete(completion) => completion(Err(error)),
        }
    }
}

/// Handle to the cached feed. Share it between threads with `Arc`.
///
/// Dropping the handle lets the worker finish every operation already
/// submitted before the connection is closed.
pub struct CacheStore {
    sender: Option<mpsc::Sender<Command>>,
    worker: Option<JoinHandle<()>>,
}

impl CacheStore {
    pub fn open(location: impl AsRef<Path>, schema: &Schema) -> Result<Self> {
        Self::open_with(location, schema, &StoreOptions::default())
    }

    pub fn open_with(location: impl AsRef<Path>, schema: &Schema, options: &StoreOptions) -> Result<Self> {
        let location = location.as_ref();
        let conn = backend::open(location, schema, options)?;
        tracing::debug!(location = %location.display(), schema = %schema.name, "feed cache opened");
        Self::spawn(conn, location.to_path_buf())
    }

    /// A store that lives only as long as this handle.
    pub fn in_memory(schema: &Schema) -> Result<Self> {
        let conn = backend::open_in_memory(schema, &StoreOptions::default())?;
        Self::spawn(conn, PathBuf::from(":memory:"))
    }

    fn spawn(conn: Connection, location: PathBuf) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || run(conn, receiver))
            .map_err(|e| Error::backend_init(location, e))?;

        Ok(CacheStore {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Read the cached feed. Never changes what is stored.
    pub fn retrieve<F>(&self, completion: F)
    where
        F: FnOnce(Result<CachedFeed>) + Send + 'static,
    {
        self.submit(Command::Retrieve(Box::new(completion)));
    }

    /// Replace whatever is cached with `items` captured at `timestamp`.
    ///
    /// On `Error::Insertion { cleared: true, .. }` the previous snapshot is
    /// gone and the cache is empty.
    pub fn insert<F>(&self, items: Vec<FeedItem>, timestamp: DateTime<Utc>, completion: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        self.submit(Command::Insert {
            items,
            timestamp,
            completion: Box::new(completion),
        });
    }

    /// Remove the cached feed. Deleting an empty cache succeeds.
    pub fn delete<F>(&self, completion: F)
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        self.submit(Command::Delete(Box::new(completion)));
    }

    fn submit(&self, command: Command) {
        let Some(sender) = &self.sender else {
            command.fail(Error::WorkerStopped);
            return;
        };

        if let Err(mpsc::SendError(command)) = sender.send(command) {
            tracing::error!(operation = command.name(), "feed cache worker is gone");
            command.fail(Error::WorkerStopped);
        }
    }
}

impl Drop for CacheStore {
    fn drop(&mut self) {
        // closing the channel ends the worker loop once the queue drains
        drop(self.sender.take());

        if let Some(worker) = self.worker.take() {
            // a completion may hold the last handle, don't join ourselves
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

fn run(mut conn: Connection, receiver: mpsc::Receiver<Command>) {
    while let Ok(command) = receiver.recv() {
        let operation = command.name();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| execute(&mut conn, command)));

        if let Err(panic_info) = outcome {
            tracing::error!(operation, "feed cache operation panicked (recovered): {}", panic_message(&*panic_info));
        }
    }

    tracing::debug!("feed cache worker stopped");
}

fn execute(conn: &mut Connection, command: Command) {
    match command {
        Command::Retrieve(completion) => {
            let result = backend::retrieve(conn).map_err(Error::Retrieval);
            match &result {
                Ok(CachedFeed::Empty) => tracing::debug!("retrieved empty feed cache"),
                Ok(CachedFeed::Found { items, .. }) => tracing::debug!(items = items.len(), "retrieved cached feed"),
                Err(e) => tracing::error!(error = %e, "retrieve failed"),
            }
            completion(result);
        }
        Command::Insert {
            items,
            timestamp,
            completion,
        } => {
            let result = backend::insert(conn, &items, &timestamp);
            if let Err(e) = &result {
                tracing::error!(error = %e, "insert failed");
            }
            completion(result);
        }
        Command::Delete(completion) => {
            let result = backend::delete(conn).map_err(Error::Deletion);
            match &result {
                Ok(removed) => tracing::debug!(removed, "feed cache deleted"),
                Err(e) => tracing::error!(error = %e, "delete failed"),
            }
            completion(result.map(|_| ()));
        }
    }
}

fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
