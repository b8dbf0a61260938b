use thiserror::Error;

/// Failures of the key/value persistence port.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the record store and the statistics counters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("stored value under `{key}` is malformed: {source}")]
    Corrupt {
        key: &'static str,
        source: serde_json::Error,
    },

    #[error("failed to serialize `{key}`: {source}")]
    Serialize {
        key: &'static str,
        source: serde_json::Error,
    },

    #[error("date formatting failed: {0}")]
    DateFormat(#[from] time::error::Format),
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("`{name}` has no readable text layer")]
    Unreadable { name: String },

    #[error("no invoice fields found in `{name}`")]
    NothingFound { name: String },

    #[error("extraction superseded by a newer submission")]
    Superseded,

    #[error("extraction task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ReviewError {
    #[error("amount `{0}` is not a non-negative number")]
    InvalidAmount(String),

    #[error("date `{0}` is not a YYYY-MM-DD calendar date")]
    InvalidDate(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config edit error: {0}")]
    Edit(#[from] toml_edit::TomlError),
}

/// Everything that can go wrong while committing a reviewed invoice.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Review(#[from] ReviewError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
