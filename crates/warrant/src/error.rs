//! Error types for session issuance.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;
use warrant_core::CoreError;
use warrant_keys::KeyError;
use warrant_store::StoreError;

/// Which side of the boundary a coded error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller sent a blank or malformed field.
    Input,
    /// The request was well-formed but refused.
    Domain,
}

/// Stable machine-readable codes for rejected requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MissingUsername,
    MissingPassword,
    MissingSessionId,
    InvalidValidFor,
    UnknownUser,
    LoginSuspended,
    LoginFailed,
    UnknownSession,
    SessionExpired,
    InvalidToken,
    UnknownBitmapVersion,
}

impl ErrorCode {
    /// The `ERR_*` string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingUsername => "ERR_MISSING_USERNAME",
            ErrorCode::MissingPassword => "ERR_MISSING_PASSWORD",
            ErrorCode::MissingSessionId => "ERR_MISSING_SESSION_ID",
            ErrorCode::InvalidValidFor => "ERR_INVALID_VALID_FOR",
            ErrorCode::UnknownUser => "ERR_UNKNOWN_USER",
            ErrorCode::LoginSuspended => "ERR_LOGIN_SUSPENDED",
            ErrorCode::LoginFailed => "ERR_LOGIN_FAILED",
            ErrorCode::UnknownSession => "ERR_UNKNOWN_SESSION",
            ErrorCode::SessionExpired => "ERR_SESSION_EXPIRED",
            ErrorCode::InvalidToken => "ERR_INVALID_TOKEN",
            ErrorCode::UnknownBitmapVersion => "ERR_UNKNOWN_BITMAP_VERSION",
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::MissingUsername
            | ErrorCode::MissingPassword
            | ErrorCode::MissingSessionId
            | ErrorCode::InvalidValidFor => ErrorKind::Input,
            _ => ErrorKind::Domain,
        }
    }

    /// Human-readable description.
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::MissingUsername => "username is required",
            ErrorCode::MissingPassword => "password is required",
            ErrorCode::MissingSessionId => "session id is required",
            ErrorCode::InvalidValidFor => "validity must be at least one second",
            ErrorCode::UnknownUser => "unknown user",
            ErrorCode::LoginSuspended => "login is suspended for this user",
            ErrorCode::LoginFailed => "login failed",
            ErrorCode::UnknownSession => "unknown session",
            ErrorCode::SessionExpired => "session expired",
            ErrorCode::InvalidToken => "invalid token",
            ErrorCode::UnknownBitmapVersion => "unknown permission bitmap version",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Errors from the issuer, resolver and verifier.
#[derive(Debug, Error)]
pub enum IssuerError {
    /// Input or domain rejection with a stable code.
    #[error("{code}: {message}")]
    Rejected { code: ErrorCode, message: String },

    /// Stored data or configuration is corrupt. Fatal to the operation.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Key material could not be loaded or used.
    #[error("key error: {0}")]
    Key(#[from] KeyError),

    /// Storage error. Invalid stored data becomes [`IssuerError::Integrity`].
    #[error("storage error: {0}")]
    Store(#[source] StoreError),

    /// Token signing failed.
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl IssuerError {
    /// A coded rejection with the default message.
    pub fn rejected(code: ErrorCode) -> Self {
        Self::Rejected {
            code,
            message: code.message().to_string(),
        }
    }

    /// The stable code, if this is an input or domain rejection.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            IssuerError::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, IssuerError::Integrity(_))
    }
}

impl From<ErrorCode> for IssuerError {
    fn from(code: ErrorCode) -> Self {
        Self::rejected(code)
    }
}

impl From<StoreError> for IssuerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InvalidData(msg) => Self::Integrity(format!("invalid stored data: {}", msg)),
            other => Self::Store(other),
        }
    }
}

impl From<CoreError> for IssuerError {
    fn from(e: CoreError) -> Self {
        Self::Integrity(e.to_string())
    }
}

/// Result type for issuer operations.
pub type Result<T> = std::result::Result<T, IssuerError>;
