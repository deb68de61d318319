use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::store::schema::{Schema, DEFAULT_SCHEMA_NAME};
use crate::store::{StoreOptions, Synchronous};

/// Settings read from `~/.config/feedcache/config.toml` (or the platform
/// equivalent). Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub store_path: Option<PathBuf>,
    pub schema_dir: Option<PathBuf>,
    pub schema_name: Option<String>,
    pub busy_timeout: Option<String>,
    pub synchronous: Option<Synchronous>,
}

#[derive(Debug)]
pub struct Config {
    pub store_path: PathBuf,
    pub schema_dir: Option<PathBuf>,
    pub schema_name: String,
    pub busy_timeout: Duration,
    pub synchronous: Synchronous,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine a data directory for the store")]
    NoDataDir,
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid busy_timeout '{value}': {source}")]
    BusyTimeout {
        value: String,
        #[source]
        source: humantime::DurationError,
    },
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "feedcache")
}

/// Default config file location, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Default store location (~/.local/share/feedcache/feed.store or platform equivalent)
pub fn default_store_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("feed.store"))
}

impl Config {
    /// Load from `path`, or from the default location when `path` is None.
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => read_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => read_file(&path)?,
                _ => FileConfig::default(),
            },
        };
        Self::from_file(file)
    }

    pub fn from_file(file: FileConfig) -> Result<Self, ConfigError> {
        let store_path = match file.store_path {
            Some(path) => path,
            None => default_store_path().ok_or(ConfigError::NoDataDir)?,
        };

        let busy_timeout = match file.busy_timeout {
            Some(value) => humantime::parse_duration(&value)
                .map_err(|source| ConfigError::BusyTimeout { value, source })?,
            None => StoreOptions::default().busy_timeout,
        };

        Ok(Config {
            store_path,
            schema_dir: file.schema_dir,
            schema_name: file.schema_name.unwrap_or_else(|| DEFAULT_SCHEMA_NAME.to_string()),
            busy_timeout,
            synchronous: file.synchronous.unwrap_or_default(),
        })
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout: self.busy_timeout,
            synchronous: self.synchronous,
        }
    }

    /// Resolve the schema descriptor: from `schema_dir` when set, else the bundled one.
    pub fn schema(&self) -> crate::Result<Schema> {
        match &self.schema_dir {
            Some(dir) => Schema::load(dir, &self.schema_name),
            None => Schema::bundled(),
        }
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
