//! # Warrant Keys
//!
//! RSA key material for signing and verifying session tokens.
//!
//! Private keys are PKCS#1 PEM, either plain or in the legacy OpenSSL
//! encrypted format (`Proc-Type: 4,ENCRYPTED` with a `DEK-Info` header).
//! Encrypted keys are decrypted with an `EVP_BytesToKey`-derived key and
//! re-wrapped as canonical PEM before parsing.
//!
//! ## Key Types
//!
//! - [`KeyMaterial`] - Loaded key pair (or public key), with JWT keys
//! - [`KeySource`] - Where to load keys from
//! - [`Cipher`] - Supported CBC ciphers
//!
//! ## Example
//!
//! ```ignore
//! use warrant_keys::{KeyMaterial, KeySource};
//!
//! let source = KeySource::private("/etc/warrant/key.pem").with_passphrase("secret");
//! let keys = KeyMaterial::load(&source)?;
//! let signing = keys.encoding_key()?;
//! ```

pub mod cipher;
pub mod config;
pub mod error;
pub mod kdf;
pub mod key;
pub mod pem;

pub use cipher::Cipher;
pub use config::KeySource;
pub use error::{KeyError, Result};
pub use kdf::{bytes_to_key, DerivedKey, KdfHash, KdfParams};
pub use key::KeyMaterial;
pub use pem::{decrypt_private_key, scan_private_key, DekInfo, PrivateKeyBlock};
