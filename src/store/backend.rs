//! SQLite side of the store. Everything here runs on the worker thread.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction};

use super::mapper;
use super::schema::Schema;
use super::{StoreOptions, Synchronous};
use crate::error::{Error, Result};
use crate::feed::{CachedFeed, FeedItem};

/// Open (or create) the database at `path` and make sure the schema exists.
pub fn open(path: &Path, schema: &Schema, options: &StoreOptions) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::backend_init(path, e))?;
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags).map_err(|e| Error::backend_init(path, e))?;

    prepare(conn, path, schema, options)
}

pub fn open_in_memory(schema: &Schema, options: &StoreOptions) -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(|e| Error::backend_init(":memory:", e))?;
    prepare(conn, Path::new(":memory:"), schema, options)
}

fn prepare(mut conn: Connection, location: &Path, schema: &Schema, options: &StoreOptions) -> Result<Connection> {
    configure(&conn, options.busy_timeout, options.synchronous).map_err(|e| Error::backend_init(location, e))?;

    let compatible = schema.apply(&mut conn).map_err(|e| Error::backend_init(location, e))?;
    if !compatible {
        return Err(Error::schema_load(
            &schema.name,
            format!(
                "store at {} was written by a newer schema than version {}",
                location.display(),
                schema.version
            ),
        ));
    }

    Ok(conn)
}

fn configure(conn: &Connection, busy_timeout: Duration, synchronous: Synchronous) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.pragma_update(None, "synchronous", synchronous.as_pragma())?;
    // Touch the file so an unwritable location fails here rather than on first use.
    conn.query_row("PRAGMA schema_version", [], |_| Ok(()))?;
    Ok(())
}

/// Read the cached snapshot.
///
/// Both reads share one transaction so a writer on another connection
/// cannot commit between the parent and child queries.
pub fn retrieve(conn: &mut Connection) -> rusqlite::Result<CachedFeed> {
    let tx = conn.transaction()?;
    let feed = read_snapshot(&tx)?;
    tx.commit()?;
    Ok(feed)
}

/// When more than one parent row is present the most recently inserted one
/// (highest id) is returned. Child rows that cannot be decoded are skipped.
fn read_snapshot(conn: &Connection) -> rusqlite::Result<CachedFeed> {
    let parent = conn
        .prepare_cached(
            "SELECT id, timestamp_secs, timestamp_nanos
             FROM feed_cache
             ORDER BY id DESC
             LIMIT 1",
        )?
        .query_row([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?)))
        .optional()?;

    let Some((cache_id, secs, nanos)) = parent else {
        return Ok(CachedFeed::Empty);
    };

    let timestamp = mapper::parent_timestamp(secs, nanos)?;

    let mut stmt = conn.prepare_cached(
        "SELECT position, item_id, description, location, url
         FROM feed_items
         WHERE cache_id = ?1
         ORDER BY position ASC",
    )?;

    let mut items = Vec::new();
    let mut rows = stmt.query(params![cache_id])?;
    while let Some(row) = rows.next()? {
        match mapper::item_from_row(row) {
            Ok(item) => items.push(item),
            Err(malformed) => {
                tracing::warn!(cache_id, %malformed, "skipping malformed cached feed item");
            }
        }
    }

    Ok(CachedFeed::Found { items, timestamp })
}

/// Replace the cached snapshot.
///
/// The clear and the write share one transaction. The write runs inside a
/// savepoint: if it fails the savepoint is rolled back and the clear is
/// still committed, leaving the store empty.
pub fn insert(conn: &mut Connection, items: &[FeedItem], timestamp: &DateTime<Utc>) -> Result<()> {
    let kept = |source: rusqlite::Error| Error::Insertion { cleared: false, source };

    let mut tx = conn.transaction().map_err(kept)?;
    let removed = clear(&tx).map_err(kept)?;

    // Err carries whether the savepoint was rolled back cleanly.
    let written: std::result::Result<(), (rusqlite::Error, bool)> = {
        let mut sp = tx.savepoint().map_err(kept)?;
        match write(&sp, items, timestamp) {
            Ok(()) => sp.commit().map_err(|e| (e, false)),
            Err(e) => {
                let rolled_back = sp.rollback().is_ok();
                Err((e, rolled_back))
            }
        }
    };

    match written {
        Ok(()) => {
            tx.commit().map_err(kept)?;
            tracing::debug!(items = items.len(), removed, "cached feed replaced");
            Ok(())
        }
        Err((source, true)) => match tx.commit() {
            Ok(()) => {
                tracing::warn!(removed, "feed write failed after clear, cache left empty");
                Err(Error::Insertion { cleared: true, source })
            }
            Err(_) => Err(kept(source)),
        },
        // dropping tx rolls everything back, the previous snapshot stays
        Err((source, false)) => Err(kept(source)),
    }
}

/// Remove the cached snapshot. Removing nothing is not an error.
pub fn delete(conn: &mut Connection) -> rusqlite::Result<usize> {
    let tx = conn.transaction()?;
    let removed = clear(&tx)?;
    tx.commit()?;
    Ok(removed)
}

/// Delete children first, then parents. Returns the number of parents removed.
fn clear(tx: &Transaction) -> rusqlite::Result<usize> {
    tx.execute("DELETE FROM feed_items", [])?;
    tx.execute("DELETE FROM feed_cache", [])
}

fn write(conn: &Connection, items: &[FeedItem], timestamp: &DateTime<Utc>) -> rusqlite::Result<()> {
    let (secs, nanos) = mapper::timestamp_to_columns(timestamp);
    conn.execute(
        "INSERT INTO feed_cache (slot, timestamp_secs, timestamp_nanos) VALUES (0, ?1, ?2)",
        params![secs, nanos],
    )?;
    let cache_id = conn.last_insert_rowid();

    let mut stmt = conn.prepare_cached(
        "INSERT INTO feed_items (cache_id, position, item_id, description, location, url)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for row in mapper::to_rows(items) {
        stmt.execute(params![
            cache_id,
            row.position,
            row.item_id,
            row.description,
            row.location,
            row.url
        ])?;
    }

    Ok(())
}
