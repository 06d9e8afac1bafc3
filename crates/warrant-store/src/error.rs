//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A unique key is already taken.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Invalid data in storage, or an edge shape the model forbids.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock was poisoned or a blocking task failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
