use std::path::PathBuf;

/// Errors surfaced by store construction and by the three store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The schema descriptor could not be resolved, parsed, or does not match
    /// the store on disk.
    #[error("failed to load schema '{name}': {reason}")]
    SchemaLoad { name: String, reason: String },

    /// The backend could not open or create storage at the given location.
    #[error("failed to open store at {}: {source}", .location.display())]
    BackendInit {
        location: PathBuf,
        #[source]
        source: BackendInitSource,
    },

    /// Reading the cached snapshot failed. Stored state is unchanged.
    #[error("failed to retrieve cached feed: {0}")]
    Retrieval(#[source] rusqlite::Error),

    /// Writing a snapshot failed.
    ///
    /// When `cleared` is true the previous snapshot had already been removed
    /// and the store is now empty. Otherwise the previous snapshot is intact.
    #[error("failed to insert feed (previous snapshot {}): {source}", previous_snapshot(.cleared))]
    Insertion {
        cleared: bool,
        #[source]
        source: rusqlite::Error,
    },

    /// Removing the cached snapshot failed. Stored state is unchanged.
    #[error("failed to delete cached feed: {0}")]
    Deletion(#[source] rusqlite::Error),

    /// The worker thread that owns the connection is no longer running.
    #[error("store worker is no longer running")]
    WorkerStopped,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendInitSource {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

fn previous_snapshot(cleared: &bool) -> &'static str {
    if *cleared {
        "cleared"
    } else {
        "kept"
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn backend_init(location: impl Into<PathBuf>, source: impl Into<BackendInitSource>) -> Self {
        Error::BackendInit {
            location: location.into(),
            source: source.into(),
        }
    }

    pub(crate) fn schema_load(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::SchemaLoad {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}
