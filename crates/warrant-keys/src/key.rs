//! Loaded RSA key material.

use std::fmt;
use std::path::Path;

use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPublicKey, LineEnding};
use rsa::pkcs8::DecodePublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::config::KeySource;
use crate::error::{KeyError, Result};
use crate::pem::{begin_marker, decrypt_private_key};

const RSA_PUBLIC_KEY: &str = "RSA PUBLIC KEY";
const PUBLIC_KEY: &str = "PUBLIC KEY";

/// An RSA key pair, or a public key alone.
///
/// Loaded once and shared read-only. JWT keys are built at load time.
#[derive(Clone)]
pub struct KeyMaterial {
    private: Option<PrivateHalf>,
    public: RsaPublicKey,
    public_pem: String,
    decoding: DecodingKey,
}

#[derive(Clone)]
struct PrivateHalf {
    pem: String,
    encoding: EncodingKey,
}

impl KeyMaterial {
    /// Parse a PKCS#1 private key PEM, decrypting it if needed.
    pub fn from_private_pem(pem: &str, passphrase: Option<&str>) -> Result<Self> {
        let plain = decrypt_private_key(pem, passphrase)?;
        let private = RsaPrivateKey::from_pkcs1_pem(&plain).map_err(|e| KeyError::Rsa(e.to_string()))?;
        let public = private.to_public_key();
        let public_pem = public
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| KeyError::Rsa(e.to_string()))?;

        let encoding = EncodingKey::from_rsa_pem(plain.as_bytes())?;
        let decoding = DecodingKey::from_rsa_pem(public_pem.as_bytes())?;

        Ok(Self {
            private: Some(PrivateHalf { pem: plain, encoding }),
            public,
            public_pem,
            decoding,
        })
    }

    /// Parse a standalone public key PEM (PKCS#1 or SPKI). No decryption.
    pub fn from_public_pem(pem: &str) -> Result<Self> {
        let public = if pem.contains(&begin_marker(RSA_PUBLIC_KEY)) {
            RsaPublicKey::from_pkcs1_pem(pem.trim()).map_err(|e| KeyError::Rsa(e.to_string()))?
        } else if pem.contains(&begin_marker(PUBLIC_KEY)) {
            RsaPublicKey::from_public_key_pem(pem.trim()).map_err(|e| KeyError::Rsa(e.to_string()))?
        } else {
            return Err(KeyError::Rsa("no RSA public key PEM block found".into()));
        };

        let public_pem = public
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| KeyError::Rsa(e.to_string()))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem.as_bytes())?;

        Ok(Self {
            private: None,
            public,
            public_pem,
            decoding,
        })
    }

    /// Load according to a [`KeySource`]. The private key wins if both are set.
    pub fn load(source: &KeySource) -> Result<Self> {
        source.validate()?;

        if let Some(path) = &source.private_key_path {
            tracing::debug!(path = %path.display(), "loading private key");
            let pem = read_pem(path)?;
            return Self::from_private_pem(&pem, source.passphrase.as_deref());
        }

        match &source.public_key_path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading public key");
                let pem = read_pem(path)?;
                Self::from_public_pem(&pem)
            }
            None => Err(KeyError::MissingKeyConfig),
        }
    }

    pub fn has_private_key(&self) -> bool {
        self.private.is_some()
    }

    /// Canonical unencrypted private key PEM, if loaded.
    pub fn private_pem(&self) -> Option<&str> {
        self.private.as_ref().map(|p| p.pem.as_str())
    }

    /// PKCS#1 public key PEM.
    pub fn public_pem(&self) -> &str {
        &self.public_pem
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// RS256 signing key.
    pub fn encoding_key(&self) -> Result<&EncodingKey> {
        self.private
            .as_ref()
            .map(|p| &p.encoding)
            .ok_or(KeyError::NoPrivateKey)
    }

    /// RS256 verification key.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("has_private_key", &self.has_private_key())
            .finish_non_exhaustive()
    }
}

fn read_pem(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| KeyError::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PLAIN: &str = include_str!("../../warrant-testkit/data/rsa_plain.pem");
    const AES256: &str = include_str!("../../warrant-testkit/data/rsa_aes256.pem");
    const DES3: &str = include_str!("../../warrant-testkit/data/rsa_des3.pem");
    const PUB_PKCS1: &str = include_str!("../../warrant-testkit/data/rsa_public_pkcs1.pem");
    const PUB_SPKI: &str = include_str!("../../warrant-testkit/data/rsa_public_spki.pem");

    fn temp_pem(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_private_derives_public() {
        let keys = KeyMaterial::from_private_pem(PLAIN, None).unwrap();
        assert!(keys.has_private_key());
        assert!(keys.encoding_key().is_ok());
        assert_eq!(keys.private_pem(), Some(PLAIN));

        let from_file = KeyMaterial::from_public_pem(PUB_PKCS1).unwrap();
        assert_eq!(keys.public_key(), from_file.public_key());
        assert_eq!(keys.public_pem().trim(), PUB_PKCS1.trim());
    }

    #[test]
    fn test_encrypted_matches_plain() {
        let plain = KeyMaterial::from_private_pem(PLAIN, None).unwrap();
        for pem in [AES256, DES3] {
            let keys = KeyMaterial::from_private_pem(pem, Some("test123456")).unwrap();
            assert_eq!(keys.private_pem(), plain.private_pem());
            assert_eq!(keys.public_key(), plain.public_key());
        }
    }

    #[test]
    fn test_spki_public_key() {
        let pkcs1 = KeyMaterial::from_public_pem(PUB_PKCS1).unwrap();
        let spki = KeyMaterial::from_public_pem(PUB_SPKI).unwrap();
        assert_eq!(pkcs1.public_key(), spki.public_key());
        assert!(!spki.has_private_key());
        assert!(matches!(spki.encoding_key(), Err(KeyError::NoPrivateKey)));
    }

    #[test]
    fn test_public_rejects_garbage() {
        assert!(matches!(
            KeyMaterial::from_public_pem("not a key"),
            Err(KeyError::Rsa(_))
        ));
    }

    #[test]
    fn test_load_from_files() {
        let private = temp_pem(AES256);
        let public = temp_pem(PUB_SPKI);

        let source = KeySource::private(private.path()).with_passphrase("test123456");
        assert!(KeyMaterial::load(&source).unwrap().has_private_key());

        let source = KeySource::public(public.path());
        assert!(!KeyMaterial::load(&source).unwrap().has_private_key());

        // Private wins when both are set.
        let source = KeySource {
            private_key_path: Some(private.path().to_path_buf()),
            passphrase: Some("test123456".into()),
            public_key_path: Some(public.path().to_path_buf()),
        };
        assert!(KeyMaterial::load(&source).unwrap().has_private_key());
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            KeyMaterial::load(&KeySource::default()),
            Err(KeyError::MissingKeyConfig)
        ));
        assert!(matches!(
            KeyMaterial::load(&KeySource::private("/nonexistent/warrant.pem")),
            Err(KeyError::Io { .. })
        ));

        let encrypted = temp_pem(AES256);
        assert!(matches!(
            KeyMaterial::load(&KeySource::private(encrypted.path())),
            Err(KeyError::PassphraseRequired)
        ));
    }
}
