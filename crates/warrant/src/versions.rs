//! The permission bitmap version log.

use std::sync::Arc;

use warrant_core::{PermissionBitmap, PermissionBits};
use warrant_store::{InsertResult, Store};

use crate::error::{ErrorCode, IssuerError, Result};
use crate::now_millis;

/// Maintains the append-only log of permission snapshots.
pub struct BitmapVersions<S: Store> {
    store: Arc<S>,
    max_attempts: u32,
}

impl<S: Store> Clone for BitmapVersions<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            max_attempts: self.max_attempts,
        }
    }
}

impl<S: Store> BitmapVersions<S> {
    pub fn new(store: Arc<S>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts,
        }
    }

    /// Return the latest snapshot if it still lists exactly the current
    /// permissions; otherwise append a new one.
    ///
    /// Version ids are random. A collision with an existing id is retried
    /// with fresh randomness, up to the configured number of attempts.
    pub async fn ensure_latest(&self) -> Result<PermissionBitmap> {
        let names = self.store.list_permission_names().await?;
        let snapshot = PermissionBitmap::snapshot_of(&names);

        if let Some(latest) = self.store.latest_bitmap().await? {
            if latest.is_current(&snapshot) {
                return Ok(latest);
            }
        }

        for attempt in 1..=self.max_attempts {
            let candidate = PermissionBitmap::create(&names, now_millis());
            match self.store.insert_bitmap(&candidate).await? {
                InsertResult::Inserted => {
                    tracing::info!(
                        version = %candidate.version,
                        permissions = candidate.len(),
                        "created permission bitmap version"
                    );
                    return Ok(candidate);
                }
                InsertResult::AlreadyExists => {
                    tracing::warn!(version = %candidate.version, attempt, "bitmap version collision");
                }
            }
        }

        Err(IssuerError::Integrity(format!(
            "no free bitmap version id after {} attempts",
            self.max_attempts
        )))
    }

    /// Look up a snapshot.
    pub async fn get(&self, version: &str) -> Result<Option<PermissionBitmap>> {
        Ok(self.store.get_bitmap(version).await?)
    }

    /// Look up a snapshot that must exist.
    pub async fn require(&self, version: &str) -> Result<PermissionBitmap> {
        self.get(version)
            .await?
            .ok_or_else(|| IssuerError::rejected(ErrorCode::UnknownBitmapVersion))
    }

    /// Encode `permissions` against a stored version.
    pub async fn encode<T: AsRef<str>>(&self, version: &str, permissions: &[T]) -> Result<PermissionBits> {
        Ok(self.require(version).await?.encode(permissions))
    }

    /// Decode `bits` against a stored version.
    pub async fn decode(&self, version: &str, bits: &PermissionBits) -> Result<Vec<String>> {
        Ok(self.require(version).await?.decode(bits))
    }
}
