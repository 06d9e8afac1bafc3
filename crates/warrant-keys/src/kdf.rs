//! OpenSSL `EVP_BytesToKey` key derivation.
//!
//! ```text
//! D_0 = ""
//! D_i = HASH^count(D_{i-1} || passphrase || salt)
//! key || iv = D_1 || D_2 || ...
//! ```
//!
//! This is the scheme legacy PEM encryption (`Proc-Type: 4,ENCRYPTED`) uses,
//! with MD5, one round, and the first 8 bytes of the IV as salt.

use digest::Digest;
use md5::Md5;
use sha1::Sha1;
use sha2::Sha256;

use crate::error::{KeyError, Result};

/// Salt length used by legacy PEM encryption.
pub const PEM_SALT_LEN: usize = 8;

/// Digest used by the KDF.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KdfHash {
    #[default]
    Md5,
    Sha1,
    Sha256,
}

/// KDF parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub hash: KdfHash,
    /// Hash rounds per block, at least 1.
    pub count: usize,
    pub key_len: usize,
    pub iv_len: usize,
}

impl KdfParams {
    /// MD5, one round, as legacy PEM uses.
    pub const fn pem(key_len: usize, iv_len: usize) -> Self {
        Self {
            hash: KdfHash::Md5,
            count: 1,
            key_len,
            iv_len,
        }
    }

    pub fn with_hash(mut self, hash: KdfHash) -> Self {
        self.hash = hash;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

/// Derived cipher key and IV.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey {
    pub key: Vec<u8>,
    pub iv: Vec<u8>,
}

// Key bytes stay out of logs.
impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key_len", &self.key.len())
            .field("iv_len", &self.iv.len())
            .finish()
    }
}

/// Derive key and IV from a passphrase.
pub fn bytes_to_key(params: &KdfParams, passphrase: &[u8], salt: Option<&[u8]>) -> Result<DerivedKey> {
    if params.count == 0 {
        return Err(KeyError::InvalidKdf("round count must be at least 1".into()));
    }
    if params.key_len == 0 {
        return Err(KeyError::InvalidKdf("key length must be non-zero".into()));
    }

    let needed = params.key_len + params.iv_len;
    let material = match params.hash {
        KdfHash::Md5 => derive::<Md5>(passphrase, salt, params.count, needed),
        KdfHash::Sha1 => derive::<Sha1>(passphrase, salt, params.count, needed),
        KdfHash::Sha256 => derive::<Sha256>(passphrase, salt, params.count, needed),
    };

    let (key, iv) = material.split_at(params.key_len);
    Ok(DerivedKey {
        key: key.to_vec(),
        iv: iv[..params.iv_len].to_vec(),
    })
}

fn derive<D: Digest>(passphrase: &[u8], salt: Option<&[u8]>, count: usize, needed: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(needed + <D as Digest>::output_size());
    let mut prev: Vec<u8> = Vec::new();

    while out.len() < needed {
        let mut hasher = D::new();
        hasher.update(&prev);
        hasher.update(passphrase);
        if let Some(salt) = salt {
            hasher.update(salt);
        }
        let mut block = hasher.finalize().to_vec();
        for _ in 1..count {
            block = D::digest(&block).to_vec();
        }
        out.extend_from_slice(&block);
        prev = block;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASS: &[u8] = b"test123456";

    fn salt() -> Vec<u8> {
        hex::decode("13F689619F77E4E55F68556C1A9FEEF8").unwrap()[..PEM_SALT_LEN].to_vec()
    }

    #[test]
    fn test_openssl_aes128_vector() {
        let d = bytes_to_key(&KdfParams::pem(16, 16), PASS, Some(&salt())).unwrap();
        assert_eq!(hex::encode(&d.key), "747783301f72d2ddbe5a19c8f1e08254");
        assert_eq!(hex::encode(&d.iv), "fa5277af059220de3ca0f9a2d2c30a1d");
    }

    #[test]
    fn test_openssl_aes256_vector() {
        let d = bytes_to_key(&KdfParams::pem(32, 16), PASS, Some(&salt())).unwrap();
        assert_eq!(
            hex::encode(&d.key),
            "747783301f72d2ddbe5a19c8f1e08254fa5277af059220de3ca0f9a2d2c30a1d"
        );
        assert_eq!(hex::encode(&d.iv), "a0ed7665f278bdd69710ed632cb3917d");
    }

    #[test]
    fn test_overrides() {
        let params = KdfParams::pem(24, 8).with_hash(KdfHash::Sha256).with_count(3);
        let d = bytes_to_key(&params, PASS, Some(&salt())).unwrap();
        assert_eq!(
            hex::encode(&d.key),
            "67acfb16016a8a71f93a659481ce79b235988806a19bb926"
        );
        assert_eq!(hex::encode(&d.iv), "84bb401d75761235");

        let params = KdfParams::pem(16, 16).with_count(2);
        let d = bytes_to_key(&params, PASS, Some(&salt())).unwrap();
        assert_eq!(hex::encode(&d.key), "3fed5ccbad10e85c485866dc2031f082");
        assert_eq!(hex::encode(&d.iv), "1285e3d0d809e4f302aca095c84feab3");
    }

    #[test]
    fn test_no_salt() {
        let params = KdfParams::pem(16, 16).with_hash(KdfHash::Sha1);
        let d = bytes_to_key(&params, PASS, None).unwrap();
        assert_eq!(hex::encode(&d.key), "fb15a1bc444e13e2c58a0a502c74a541");
        assert_eq!(hex::encode(&d.iv), "06b5a0dc5491cc31cce1d033e6373170");
    }

    #[test]
    fn test_rejects_zero_count() {
        let params = KdfParams::pem(16, 16).with_count(0);
        assert!(matches!(
            bytes_to_key(&params, PASS, None),
            Err(KeyError::InvalidKdf(_))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let d = bytes_to_key(&KdfParams::pem(16, 16), PASS, Some(&salt())).unwrap();
        assert!(!format!("{:?}", d).contains("7477"));
    }

    proptest::proptest! {
        #[test]
        fn prop_key_and_iv_split_one_stream(
            pass in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..32),
            key_len in 1usize..48,
            iv_len in 0usize..24,
            count in 1usize..4,
        ) {
            let split = KdfParams::pem(key_len, iv_len).with_count(count).with_hash(KdfHash::Sha1);
            let whole = KdfParams::pem(key_len + iv_len, 0).with_count(count).with_hash(KdfHash::Sha1);

            let a = bytes_to_key(&split, &pass, Some(&salt())).unwrap();
            let b = bytes_to_key(&whole, &pass, Some(&salt())).unwrap();
            proptest::prop_assert_eq!([a.key, a.iv].concat(), b.key);
        }
    }
}
