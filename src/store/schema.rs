//! Schema descriptors.
//!
//! A descriptor is a TOML file naming the schema, its version and the DDL
//! statements that create it. The descriptor shipped with the crate is
//! compiled in; [`Schema::load`] resolves one from a bundle directory instead.

use std::path::Path;

use rusqlite::Connection;
use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_SCHEMA_NAME: &str = "feed_store";

const BUNDLED_DESCRIPTOR: &str = include_str!("../../schema/feed_store.toml");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Schema {
    pub name: String,
    pub version: u32,
    pub statements: Vec<String>,
}

impl Schema {
    /// The descriptor compiled into this crate.
    pub fn bundled() -> Result<Self> {
        Self::parse(DEFAULT_SCHEMA_NAME, BUNDLED_DESCRIPTOR)
    }

    /// Resolve `<bundle_dir>/<name>.toml`.
    pub fn load(bundle_dir: &Path, name: &str) -> Result<Self> {
        let path = bundle_dir.join(format!("{name}.toml"));
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::schema_load(name, format!("{}: {e}", path.display())))?;
        Self::parse(name, &contents)
    }

    pub fn parse(name: &str, contents: &str) -> Result<Self> {
        let schema: Schema = toml::from_str(contents).map_err(|e| Error::schema_load(name, e))?;

        if schema.version == 0 {
            return Err(Error::schema_load(name, "version must be at least 1"));
        }
        if schema.statements.iter().all(|s| s.trim().is_empty()) {
            return Err(Error::schema_load(name, "descriptor has no statements"));
        }

        Ok(schema)
    }

    /// Create the tables if needed and stamp the version.
    ///
    /// Returns `Ok(false)` when the store on disk was written by a newer
    /// schema version than this descriptor.
    pub(crate) fn apply(&self, conn: &mut Connection) -> rusqlite::Result<bool> {
        let on_disk: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if on_disk > self.version {
            return Ok(false);
        }

        let tx = conn.transaction()?;
        for statement in &self.statements {
            tx.execute_batch(statement)?;
        }
        if on_disk < self.version {
            tx.pragma_update(None, "user_version", self.version)?;
        }
        tx.commit()?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_descriptor_parses() {
        let schema = Schema::bundled().unwrap();
        assert_eq!(schema.name, DEFAULT_SCHEMA_NAME);
        assert_eq!(schema.version, 1);
        assert_eq!(schema.statements.len(), 3);
    }

    #[test]
    fn load_missing_descriptor_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Schema::load(dir.path(), "missing").unwrap_err();
        assert!(matches!(err, Error::SchemaLoad { ref name, .. } if name == "missing"));
    }

    #[test]
    fn load_reads_descriptor_from_bundle_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("custom.toml"),
            "name = \"custom\"\nversion = 2\nstatements = [\"CREATE TABLE IF NOT EXISTS t (x)\"]\n",
        )
        .unwrap();

        let schema = Schema::load(dir.path(), "custom").unwrap();
        assert_eq!(schema.version, 2);
    }

    #[test]
    fn invalid_toml_is_schema_error() {
        let err = Schema::parse("broken", "version = [").unwrap_err();
        assert!(matches!(err, Error::SchemaLoad { .. }));
    }

    #[test]
    fn zero_version_is_rejected() {
        let err = Schema::parse("v0", "name = \"v0\"\nversion = 0\nstatements = [\"SELECT 1\"]").unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn empty_statements_are_rejected() {
        let err = Schema::parse("none", "name = \"none\"\nversion = 1\nstatements = []").unwrap_err();
        assert!(err.to_string().contains("no statements"));
    }

    #[test]
    fn apply_is_idempotent_and_stamps_version() {
        let schema = Schema::bundled().unwrap();
        let mut conn = Connection::open_in_memory().unwrap();

        assert!(schema.apply(&mut conn).unwrap());
        assert!(schema.apply(&mut conn).unwrap());

        let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0)).unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn apply_refuses_newer_store() {
        let schema = Schema::bundled().unwrap();
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", 9).unwrap();

        assert!(!schema.apply(&mut conn).unwrap());
    }
}
