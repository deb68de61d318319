//! Translation between feed items and stored rows.
//!
//! Items are written with `position = index` and read back ordered by
//! position. Optional text maps to NULL, so `None` and `Some("")` stay
//! distinct. A row whose columns cannot be turned back into a `FeedItem`
//! is reported as [`MalformedRow`] and left to the caller to skip.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use url::Url;
use uuid::Uuid;

use crate::feed::FeedItem;

/// Child row shape, in insertion column order.
pub struct ItemRow<'a> {
    pub position: i64,
    pub item_id: String,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub url: &'a str,
}

#[derive(Debug)]
pub struct MalformedRow {
    pub position: Option<i64>,
    pub reason: String,
}

impl std::fmt::Display for MalformedRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position {
            Some(position) => write!(f, "item at position {position}: {}", self.reason),
            None => write!(f, "item at unknown position: {}", self.reason),
        }
    }
}

pub fn to_rows(items: &[FeedItem]) -> impl Iterator<Item = ItemRow<'_>> {
    items.iter().enumerate().map(|(index, item)| ItemRow {
        position: i64::try_from(index).unwrap_or(i64::MAX),
        item_id: item.id.hyphenated().to_string(),
        description: item.description.as_deref(),
        location: item.location.as_deref(),
        url: item.url.as_str(),
    })
}

/// Decode one row of `SELECT position, item_id, description, location, url`.
pub fn item_from_row(row: &Row) -> Result<FeedItem, MalformedRow> {
    let position = row.get::<_, i64>(0).ok();
    let malformed = |reason: String| MalformedRow { position, reason };

    let item_id: String = row.get(1).map_err(|e| malformed(format!("id column: {e}")))?;
    let id = Uuid::parse_str(&item_id).map_err(|e| malformed(format!("invalid id '{item_id}': {e}")))?;

    let description: Option<String> = row
        .get(2)
        .map_err(|e| malformed(format!("description column: {e}")))?;
    let location: Option<String> = row
        .get(3)
        .map_err(|e| malformed(format!("location column: {e}")))?;

    let url_str: String = row.get(4).map_err(|e| malformed(format!("url column: {e}")))?;
    let url = Url::parse(&url_str).map_err(|e| malformed(format!("invalid url '{url_str}': {e}")))?;

    Ok(FeedItem {
        id,
        description,
        location,
        url,
    })
}

/// Split a timestamp into whole seconds and subsecond nanos for storage.
pub fn timestamp_to_columns(timestamp: &DateTime<Utc>) -> (i64, i64) {
    (timestamp.timestamp(), i64::from(timestamp.timestamp_subsec_nanos()))
}

pub fn timestamp_from_columns(secs: i64, nanos: i64) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(nanos).ok()?;
    DateTime::from_timestamp(secs, nanos)
}

/// Decode the parent row's timestamp, naming the offending column on failure.
///
/// Nanos may reach up to two seconds' worth to carry a leap second.
pub fn parent_timestamp(secs: i64, nanos: i64) -> rusqlite::Result<DateTime<Utc>> {
    if !(0..2_000_000_000).contains(&nanos) {
        return Err(rusqlite::Error::IntegralValueOutOfRange(2, nanos));
    }
    timestamp_from_columns(secs, nanos).ok_or(rusqlite::Error::IntegralValueOutOfRange(1, secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rusqlite::Connection;

    fn item(n: u128) -> FeedItem {
        FeedItem::new(
            Uuid::from_u128(n),
            Url::parse(&format!("https://example.com/{n}")).unwrap(),
        )
    }

    fn table_with(rows: &[(i64, &str, Option<&str>, Option<&str>, &str)]) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (position INTEGER, item_id, description, location, url)",
        )
        .unwrap();
        for (position, id, description, location, url) in rows {
            conn.execute(
                "INSERT INTO items VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![position, id, description, location, url],
            )
            .unwrap();
        }
        conn
    }

    fn read_all(conn: &Connection) -> Vec<Result<FeedItem, MalformedRow>> {
        let mut stmt = conn
            .prepare("SELECT position, item_id, description, location, url FROM items ORDER BY position")
            .unwrap();
        let mut rows = stmt.query([]).unwrap();
        let mut out = Vec::new();
        while let Some(row) = rows.next().unwrap() {
            out.push(item_from_row(row));
        }
        out
    }

    #[test]
    fn rows_carry_positions_in_input_order() {
        let items = vec![item(3), item(1), item(2)];
        let rows: Vec<_> = to_rows(&items).collect();

        assert_eq!(rows.len(), 3);
        for (index, row) in rows.iter().enumerate() {
            assert_eq!(row.position, index as i64);
            assert_eq!(row.item_id, items[index].id.to_string());
            assert_eq!(row.url, items[index].url.as_str());
        }
    }

    #[test]
    fn optional_text_keeps_none_and_empty_apart() {
        let items = vec![item(1), item(2).with_description("").with_location("")];
        let rows: Vec<_> = to_rows(&items).collect();

        assert_eq!(rows[0].description, None);
        assert_eq!(rows[0].location, None);
        assert_eq!(rows[1].description, Some(""));
        assert_eq!(rows[1].location, Some(""));
    }

    #[test]
    fn decodes_well_formed_row() {
        let id = Uuid::from_u128(7).to_string();
        let conn = table_with(&[(0, &id, Some("a cat"), None, "https://example.com/7")]);

        let decoded = read_all(&conn);
        let item = decoded[0].as_ref().unwrap();
        assert_eq!(item.id, Uuid::from_u128(7));
        assert_eq!(item.description.as_deref(), Some("a cat"));
        assert_eq!(item.location, None);
        assert_eq!(item.url.as_str(), "https://example.com/7");
    }

    #[test]
    fn rejects_row_with_bad_id() {
        let conn = table_with(&[(4, "not-a-uuid", None, None, "https://example.com")]);

        let err = read_all(&conn).pop().unwrap().unwrap_err();
        assert_eq!(err.position, Some(4));
        assert!(err.reason.contains("invalid id"));
    }

    #[test]
    fn rejects_row_with_bad_url() {
        let id = Uuid::from_u128(1).to_string();
        let conn = table_with(&[(0, &id, None, None, "no scheme here")]);

        let err = read_all(&conn).pop().unwrap().unwrap_err();
        assert!(err.reason.contains("invalid url"));
    }

    #[test]
    fn rejects_row_with_wrong_column_type() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (position INTEGER, item_id, description, location, url);
             INSERT INTO items VALUES (0, X'00FF', NULL, NULL, 'https://example.com');",
        )
        .unwrap();

        let err = read_all(&conn).pop().unwrap().unwrap_err();
        assert!(err.reason.contains("id column"));
    }

    #[test]
    fn timestamp_columns_keep_nanoseconds() {
        let timestamp = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let (secs, nanos) = timestamp_to_columns(&timestamp);

        assert_eq!(timestamp_from_columns(secs, nanos), Some(timestamp));
    }

    #[test]
    fn timestamp_columns_handle_pre_epoch_values() {
        let timestamp = Utc.timestamp_opt(-86_400 * 365, 5).unwrap();
        let (secs, nanos) = timestamp_to_columns(&timestamp);

        assert_eq!(timestamp_from_columns(secs, nanos), Some(timestamp));
    }

    #[test]
    fn negative_nanos_are_rejected() {
        assert_eq!(timestamp_from_columns(0, -1), None);
    }

    #[test]
    fn parent_timestamp_blames_nanos_column() {
        let err = parent_timestamp(1_700_000_000, -1).unwrap_err();
        assert!(matches!(err, rusqlite::Error::IntegralValueOutOfRange(2, -1)));

        let err = parent_timestamp(0, 5_000_000_000).unwrap_err();
        assert!(matches!(err, rusqlite::Error::IntegralValueOutOfRange(2, 5_000_000_000)));
    }

    #[test]
    fn parent_timestamp_blames_seconds_column() {
        let err = parent_timestamp(i64::MAX, 0).unwrap_err();
        assert!(matches!(err, rusqlite::Error::IntegralValueOutOfRange(1, i64::MAX)));
    }

    #[test]
    fn parent_timestamp_accepts_stored_columns() {
        let timestamp = Utc.timestamp_opt(1_700_000_000, 42).unwrap();
        let (secs, nanos) = timestamp_to_columns(&timestamp);

        assert_eq!(parent_timestamp(secs, nanos).unwrap(), timestamp);
    }
}
