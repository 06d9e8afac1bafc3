//! Permission bitmaps: compact, versioned encoding of permission sets.
//!
//! A [`PermissionBitmap`] is an immutable snapshot of every permission name
//! that existed when it was created, sorted and comma-joined. A permission set
//! is encoded against one snapshot as an unsigned integer where the first
//! snapshot name is the most significant bit and the last is bit 0.
//!
//! Bit positions only mean something relative to their snapshot. Decoding a
//! [`PermissionBits`] value against any other version yields an unrelated set.

use std::collections::HashSet;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};

use crate::error::{CoreError, Result};

/// Length of a generated version identifier.
pub const VERSION_LEN: usize = 8;

/// Bytes of fresh randomness mixed into each version identifier.
pub const VERSION_SALT_LEN: usize = 16;

/// An arbitrary-width unsigned integer holding encoded permissions.
///
/// Stored as minimal big-endian bytes (zero is the empty byte string), and
/// serialized as a lowercase hexadecimal string so that snapshots with more
/// than 64 permissions survive a JSON round trip.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct PermissionBits(Vec<u8>);

impl PermissionBits {
    /// The zero bitmap.
    pub const fn zero() -> Self {
        Self(Vec::new())
    }

    /// Build from big-endian bytes; leading zero bytes are dropped.
    pub fn from_be_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let mut bytes = bytes.into();
        let leading = bytes.iter().take_while(|b| **b == 0).count();
        bytes.drain(..leading);
        Self(bytes)
    }

    /// Build from a machine integer.
    pub fn from_u64(value: u64) -> Self {
        Self::from_be_bytes(value.to_be_bytes().to_vec())
    }

    /// Minimal big-endian bytes.
    pub fn as_be_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to a machine integer, if it fits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.0.len() > 8 {
            return None;
        }
        Some(self.0.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    /// Whether every bit is clear.
    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    /// Test bit `pos`, counted from the least significant bit.
    pub fn bit(&self, pos: usize) -> bool {
        let byte = pos / 8;
        if byte >= self.0.len() {
            return false;
        }
        let idx = self.0.len() - 1 - byte;
        (self.0[idx] >> (pos % 8)) & 1 == 1
    }

    /// Lowercase hex without leading zeros; `"0"` for zero.
    pub fn to_hex(&self) -> String {
        let hex = hex::encode(&self.0);
        let trimmed = hex.trim_start_matches('0');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Parse a hex string as produced by [`to_hex`](Self::to_hex).
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(CoreError::MalformedBits("empty string".into()));
        }
        let padded = if s.len() % 2 == 1 {
            format!("0{}", s)
        } else {
            s.to_string()
        };
        let bytes = hex::decode(&padded).map_err(|e| CoreError::MalformedBits(e.to_string()))?;
        Ok(Self::from_be_bytes(bytes))
    }
}

impl fmt::Debug for PermissionBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PermissionBits(0x{})", self.to_hex())
    }
}

impl fmt::Display for PermissionBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<u64> for PermissionBits {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl Serialize for PermissionBits {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PermissionBits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct BitsVisitor;

        impl<'de> Visitor<'de> for BitsVisitor {
            type Value = PermissionBits;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a hexadecimal string or an unsigned integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
                PermissionBits::from_hex(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
                Ok(PermissionBits::from_u64(v))
            }
        }

        deserializer.deserialize_any(BitsVisitor)
    }
}

/// An immutable, named snapshot of all known permission names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionBitmap {
    /// Short opaque identifier, unique across the version log.
    pub version: String,

    /// Sorted, comma-joined permission names.
    pub permissions: String,

    /// Creation time (Unix ms).
    pub created_at: i64,
}

impl PermissionBitmap {
    /// Join permission names into canonical snapshot form (sorted, deduplicated).
    pub fn snapshot_of<S: AsRef<str>>(names: &[S]) -> String {
        let mut sorted: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
        sorted.sort_unstable();
        sorted.dedup();
        sorted.join(",")
    }

    /// Create a new snapshot with a freshly generated version.
    ///
    /// Callers persisting the result must retry with another call if the
    /// version is already taken.
    pub fn create<S: AsRef<str>>(names: &[S], created_at: i64) -> Self {
        let permissions = Self::snapshot_of(names);
        let mut salt = [0u8; VERSION_SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self {
            version: Self::version_for(&permissions, &salt),
            permissions,
            created_at,
        }
    }

    /// Version identifier: `base64(SHA1(snapshot || salt))`, first 8 characters.
    pub fn version_for(snapshot: &str, salt: &[u8]) -> String {
        let mut hasher = Sha1::new();
        hasher.update(snapshot.as_bytes());
        hasher.update(salt);
        let digest = hasher.finalize();
        let mut encoded = STANDARD.encode(digest);
        encoded.truncate(VERSION_LEN);
        encoded
    }

    /// Permission names in bit order (index 0 is the most significant bit).
    pub fn names(&self) -> Vec<&str> {
        if self.permissions.is_empty() {
            Vec::new()
        } else {
            self.permissions.split(',').collect()
        }
    }

    /// Number of permissions in the snapshot.
    pub fn len(&self) -> usize {
        self.names().len()
    }

    /// Whether the snapshot holds no permissions.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Whether this snapshot matches the given canonical snapshot string.
    pub fn is_current(&self, snapshot: &str) -> bool {
        self.permissions == snapshot
    }

    /// Encode a permission set against this snapshot.
    ///
    /// Names not present in the snapshot cannot be represented and are
    /// silently dropped.
    pub fn encode<S: AsRef<str>>(&self, permissions: &[S]) -> PermissionBits {
        let held: HashSet<&str> = permissions.iter().map(AsRef::as_ref).collect();
        let names = self.names();
        let n = names.len();

        let mut bytes = vec![0u8; (n + 7) / 8];
        let last = bytes.len().saturating_sub(1);
        for (i, name) in names.iter().enumerate() {
            if held.contains(name) {
                let pos = n - 1 - i;
                bytes[last - pos / 8] |= 1 << (pos % 8);
            }
        }

        PermissionBits::from_be_bytes(bytes)
    }

    /// Decode bits against this snapshot, returning sorted names.
    ///
    /// Bits above the snapshot width are ignored.
    pub fn decode(&self, bits: &PermissionBits) -> Vec<String> {
        let names = self.names();
        let n = names.len();

        let mut out: Vec<String> = names
            .iter()
            .enumerate()
            .filter(|(i, _)| bits.bit(n - 1 - i))
            .map(|(_, name)| name.to_string())
            .collect();
        out.sort();
        out
    }
}
