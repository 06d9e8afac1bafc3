//! Key source configuration.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{KeyError, Result};

/// Where to load RSA key material from.
///
/// A private key wins when both paths are set; the public key is then derived
/// from it and `public_key_path` is ignored.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeySource {
    /// PKCS#1 private key PEM, optionally legacy-encrypted.
    pub private_key_path: Option<PathBuf>,

    /// Passphrase for an encrypted private key.
    #[serde(skip_serializing)]
    pub passphrase: Option<String>,

    /// Public key PEM (`RSA PUBLIC KEY` or `PUBLIC KEY`), for verify-only setups.
    pub public_key_path: Option<PathBuf>,
}

impl KeySource {
    /// Load from a private key file.
    pub fn private(path: impl Into<PathBuf>) -> Self {
        Self {
            private_key_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Load from a public key file only.
    pub fn public(path: impl Into<PathBuf>) -> Self {
        Self {
            public_key_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Sets the passphrase.
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Check that at least one key path is configured.
    pub fn validate(&self) -> Result<()> {
        if self.private_key_path.is_none() && self.public_key_path.is_none() {
            return Err(KeyError::MissingKeyConfig);
        }
        Ok(())
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySource")
            .field("private_key_path", &self.private_key_path)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("public_key_path", &self.public_key_path)
            .finish()
    }
}
