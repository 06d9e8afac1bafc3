//! Error types for Warrant Core.

use thiserror::Error;

/// Core errors: malformed data encountered while interpreting stored values.
///
/// None of these are caller mistakes. They indicate corrupted or
/// misconfigured data and are fatal to the operation that hit them.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown grant mode: {0:?}")]
    UnknownGrantMode(String),

    #[error("unsupported password algorithm: {0:?}")]
    UnsupportedPasswordAlgorithm(String),

    #[error("malformed password hash: {0}")]
    MalformedPasswordHash(String),

    #[error("malformed permission bits: {0}")]
    MalformedBits(String),

    #[error("invalid membership: {0}")]
    InvalidMembership(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
