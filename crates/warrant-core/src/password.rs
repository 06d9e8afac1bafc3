//! Stored password format: `{ALGO}hexdigest`.

use std::fmt;
use std::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};

/// Digest used for a stored password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordAlgorithm {
    Sha1,
    Md5,
    Sha256,
}

impl PasswordAlgorithm {
    /// Tag as it appears between the braces.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PasswordAlgorithm::Sha1 => "SHA1",
            PasswordAlgorithm::Md5 => "MD5",
            PasswordAlgorithm::Sha256 => "SHA256",
        }
    }

    /// Lowercase hex digest of `input`.
    pub fn hex_digest(&self, input: &[u8]) -> String {
        match self {
            PasswordAlgorithm::Sha1 => hex::encode(Sha1::digest(input)),
            PasswordAlgorithm::Md5 => hex::encode(Md5::digest(input)),
            PasswordAlgorithm::Sha256 => hex::encode(Sha256::digest(input)),
        }
    }
}

impl fmt::Display for PasswordAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PasswordAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SHA1" => Ok(PasswordAlgorithm::Sha1),
            "MD5" => Ok(PasswordAlgorithm::Md5),
            "SHA256" => Ok(PasswordAlgorithm::Sha256),
            _ => Err(CoreError::UnsupportedPasswordAlgorithm(s.to_string())),
        }
    }
}

/// A parsed stored password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub algorithm: PasswordAlgorithm,
    pub digest: String,
}

impl PasswordHash {
    /// Parse the stored `{ALGO}hexdigest` form.
    pub fn parse(stored: &str) -> Result<Self> {
        let rest = stored
            .strip_prefix('{')
            .ok_or_else(|| CoreError::MalformedPasswordHash("missing '{'".into()))?;
        let (algo, digest) = rest
            .split_once('}')
            .ok_or_else(|| CoreError::MalformedPasswordHash("missing '}'".into()))?;

        if digest.is_empty() || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoreError::MalformedPasswordHash(
                "digest is not hexadecimal".into(),
            ));
        }

        Ok(Self {
            algorithm: algo.parse()?,
            digest: digest.to_string(),
        })
    }

    /// Hash a cleartext password.
    pub fn compute(algorithm: PasswordAlgorithm, password: &str) -> Self {
        Self {
            algorithm,
            digest: algorithm.hex_digest(password.as_bytes()),
        }
    }

    /// Whether `password` hashes to the stored digest (hex compared case-insensitively).
    pub fn verify(&self, password: &str) -> bool {
        self.algorithm
            .hex_digest(password.as_bytes())
            .eq_ignore_ascii_case(&self.digest)
    }
}

impl fmt::Display for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.algorithm, self.digest)
    }
}

impl FromStr for PasswordHash {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
