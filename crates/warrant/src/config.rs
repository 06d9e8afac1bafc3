//! Configuration for the issuer and the composition root.
//!
//! Loading configuration files is left to the embedding application; these
//! types only derive `Deserialize` so any loader can fill them.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use warrant_keys::KeySource;

/// Issuer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
    /// Session lifetime when the caller does not pass one.
    #[serde(with = "duration_secs")]
    pub default_valid_for: Duration,

    /// How many fresh version ids to try before giving up on a new bitmap.
    pub max_version_attempts: u32,

    /// Clock skew tolerance for token `exp` checks, in seconds.
    pub leeway_secs: u64,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            default_valid_for: Duration::from_secs(3600),
            max_version_attempts: 16,
            leeway_secs: 0,
        }
    }
}

/// Everything [`crate::open`] needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarrantConfig {
    pub keys: KeySource,

    /// SQLite database file. `None` opens an in-memory database.
    pub database: Option<PathBuf>,

    pub issuer: IssuerConfig,
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
