//! # Warrant
//!
//! Session issuance for a role/group RBAC model. A login checks credentials,
//! resolves the user's effective permissions, packs them into a versioned
//! bitmap and returns an RS256-signed token carrying that bitmap.
//!
//! ## Overview
//!
//! - **Resolution**: group, role and direct grant edges are replayed in
//!   priority order; `allowed` adds, `denied` removes, last edge wins
//! - **Bitmaps**: permissions are encoded against an immutable, versioned
//!   snapshot of all permission names, so tokens stay small
//! - **Sessions**: write-once rows; renewal issues a fresh session
//! - **Keys**: PKCS#1 RSA keys, including legacy OpenSSL-encrypted PEM
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warrant::{LoginOptions, WarrantConfig};
//! use warrant::keys::KeySource;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = WarrantConfig {
//!         keys: KeySource::private("/etc/warrant/key.pem").with_passphrase("secret"),
//!         database: Some("warrant.db".into()),
//!         ..Default::default()
//!     };
//!     let issuer = warrant::open(&config)?;
//!
//!     let session = issuer.login("alice", "hunter2", LoginOptions::default()).await?;
//!     let claims = issuer.verifier().verify(&session.token)?;
//!     let permissions = issuer.verifier().permissions_for(&claims).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `warrant::core` - Data model, resolver fold and bitmap codec
//! - `warrant::keys` - Key material
//! - `warrant::store` - Storage abstraction and SQLite

pub mod claims;
pub mod config;
pub mod error;
pub mod events;
pub mod issuer;
pub mod resolver;
pub mod verify;
pub mod versions;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;

// Re-export component crates
pub use warrant_core as core;
pub use warrant_keys as keys;
pub use warrant_store as store;

pub use claims::{BitmapClaim, SessionClaims, SessionPayload, UserClaim};
pub use config::{IssuerConfig, WarrantConfig};
pub use error::{ErrorCode, ErrorKind, IssuerError, Result};
pub use events::{
    BroadcastObserver, IssueKind, NoopObserver, SessionIssued, SessionObserver, TracingObserver,
};
pub use issuer::{LoginOptions, SessionIssuer};
pub use resolver::PermissionResolver;
pub use verify::TokenVerifier;
pub use versions::BitmapVersions;

use warrant_keys::KeyMaterial;
use warrant_store::SqliteStore;

/// Load keys, open (or migrate) the database and wire an issuer.
///
/// Uses an in-memory database when `config.database` is `None`.
pub fn open(config: &WarrantConfig) -> anyhow::Result<SessionIssuer<SqliteStore>> {
    let keys = KeyMaterial::load(&config.keys).context("failed to load key material")?;

    let store = match &config.database {
        Some(path) => SqliteStore::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?,
        None => SqliteStore::open_memory().context("failed to open in-memory database")?,
    };

    let issuer = SessionIssuer::new(Arc::new(store), Arc::new(keys), config.issuer.clone())
        .context("failed to create session issuer")?;

    tracing::info!(
        database = ?config.database,
        default_valid_for_secs = config.issuer.default_valid_for.as_secs(),
        "warrant issuer ready"
    );
    Ok(issuer)
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
