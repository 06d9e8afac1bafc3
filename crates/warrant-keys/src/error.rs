//! Error types for key material.

use thiserror::Error;

/// Errors loading or using RSA key material.
///
/// All of these are configuration or integrity failures. None is retried.
#[derive(Debug, Error)]
pub enum KeyError {
    /// No `BEGIN RSA PRIVATE KEY` marker, or the matching end marker is missing.
    #[error("not a PEM private key: {0}")]
    NotPrivateKey(String),

    /// The key is encrypted and no passphrase was supplied.
    #[error("passphrase required")]
    PassphraseRequired,

    /// DEK-Info names a cipher we cannot decrypt.
    #[error("unsupported cipher: {0:?}")]
    UnsupportedCipher(String),

    /// Missing or malformed `DEK-Info` header.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// Neither a private nor a public key path was configured.
    #[error("missing key configuration: a private or public key path is required")]
    MissingKeyConfig,

    /// Invalid key derivation parameters.
    #[error("invalid KDF parameters: {0}")]
    InvalidKdf(String),

    /// Block cipher failure (bad key length or padding).
    #[error("decryption failed: {0}")]
    Decrypt(String),

    /// Body is not valid base64.
    #[error("invalid base64 in PEM body: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded key is not a valid RSA key.
    #[error("invalid RSA key: {0}")]
    Rsa(String),

    /// Signing was requested from public-only key material.
    #[error("no private key loaded")]
    NoPrivateKey,

    /// jsonwebtoken rejected the key.
    #[error("JWT key error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Reading a key file failed.
    #[error("failed to read key file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for key operations.
pub type Result<T> = std::result::Result<T, KeyError>;
