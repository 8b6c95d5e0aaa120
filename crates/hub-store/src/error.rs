use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Table or column names must be plain identifiers.
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Records and patches must be JSON objects; filter values must be scalars.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Blob too large: {size} bytes (max {max})")]
    BlobTooLarge { size: usize, max: usize },

    #[error("Empty blob")]
    EmptyBlob,

    /// Uploads never overwrite an existing object.
    #[error("Blob already exists: {0}")]
    BlobExists(String),

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Path traversal detected")]
    PathTraversal,

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
