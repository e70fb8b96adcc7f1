use std::path::PathBuf;

/// Failures of a durable key/value store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage key must not be empty")]
    EmptyKey,

    #[error("storage quota exceeded writing {key:?}: {needed} bytes over a {limit} byte limit")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    #[error("storage I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures loading the theme configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read theme config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid theme config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("property group {group:?} referenced by {selector:?} is not in the catalog")]
    UnknownGroup { selector: String, group: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("CSS did not parse: {0}")]
    Css(String),

    #[error("failed to write {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = ThemeError> = std::result::Result<T, E>;
