//! Sessions: time-bounded login records.
//!
//! A session row is written once and never mutated. Renewal creates a new row
//! with a fresh id and secret.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// Bytes of randomness mixed into session ids and secrets.
pub const SESSION_NONCE_LEN: usize = 16;

/// Opaque, unguessable session identifier (40 hex chars).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a fresh id: `hex(SHA1(decimal(now_ms) || 16 random bytes))`.
    pub fn generate(now_ms: i64) -> Self {
        let mut nonce = [0u8; SESSION_NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let mut hasher = Sha1::new();
        hasher.update(now_ms.to_string().as_bytes());
        hasher.update(nonce);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.0.get(..12).unwrap_or(&self.0);
        write!(f, "SessionId({})", short)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Generate a session secret: `base64(SHA1(session_id || 16 random bytes))`.
pub fn generate_secret(id: &SessionId) -> String {
    let mut nonce = [0u8; SESSION_NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let mut hasher = Sha1::new();
    hasher.update(id.as_str().as_bytes());
    hasher.update(nonce);
    STANDARD.encode(hasher.finalize())
}

/// A persisted session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub username: String,

    /// Issue time (Unix ms).
    pub issued_at: i64,

    /// Expiry time (Unix ms). The session is dead from this instant on.
    pub expires_at: i64,

    pub secret: String,
}

impl Session {
    /// Create a session with fresh id and secret, valid for `valid_for_ms`.
    pub fn issue(username: impl Into<String>, now_ms: i64, valid_for_ms: i64) -> Self {
        let id = SessionId::generate(now_ms);
        let secret = generate_secret(&id);
        Self {
            id,
            username: username.into(),
            issued_at: now_ms,
            expires_at: now_ms.saturating_add(valid_for_ms),
            secret,
        }
    }

    /// Whether the session is expired at `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
