//! Golden vectors and key fixtures.
//!
//! The KDF vectors must match OpenSSL's `EVP_BytesToKey` exactly. The PEM
//! fixtures were produced with `openssl rsa -<cipher> -traditional` from
//! [`PLAIN_PEM`] and all decrypt back to it byte for byte.

use warrant_keys::{bytes_to_key, Cipher, KdfHash, KdfParams};

/// Passphrase of every encrypted fixture.
pub const PASSPHRASE: &str = "test123456";

/// 2048-bit PKCS#1 private key, unencrypted, canonical 64-column PEM.
pub const PLAIN_PEM: &str = include_str!("../data/rsa_plain.pem");

/// Public half of [`PLAIN_PEM`], PKCS#1 (`RSA PUBLIC KEY`).
pub const PUBLIC_PKCS1_PEM: &str = include_str!("../data/rsa_public_pkcs1.pem");

/// Public half of [`PLAIN_PEM`], SPKI (`PUBLIC KEY`).
pub const PUBLIC_SPKI_PEM: &str = include_str!("../data/rsa_public_spki.pem");

/// An unrelated public key.
pub const OTHER_PUBLIC_PEM: &str = include_str!("../data/rsa_other_public_pkcs1.pem");

/// A legacy-encrypted copy of [`PLAIN_PEM`].
#[derive(Debug, Clone)]
pub struct EncryptedPem {
    pub name: &'static str,
    pub cipher: Cipher,
    pub pem: &'static str,
}

/// Every encrypted fixture.
pub fn encrypted_pems() -> Vec<EncryptedPem> {
    vec![
        EncryptedPem {
            name: "aes-128-cbc",
            cipher: Cipher::Aes128Cbc,
            pem: include_str!("../data/rsa_aes128.pem"),
        },
        EncryptedPem {
            name: "aes-192-cbc",
            cipher: Cipher::Aes192Cbc,
            pem: include_str!("../data/rsa_aes192.pem"),
        },
        EncryptedPem {
            name: "aes-256-cbc",
            cipher: Cipher::Aes256Cbc,
            pem: include_str!("../data/rsa_aes256.pem"),
        },
        EncryptedPem {
            name: "des-cbc",
            cipher: Cipher::DesCbc,
            pem: include_str!("../data/rsa_des.pem"),
        },
        EncryptedPem {
            name: "des-ede3-cbc",
            cipher: Cipher::DesEde3Cbc,
            pem: include_str!("../data/rsa_des3.pem"),
        },
    ]
}

/// A key derivation test vector.
#[derive(Debug, Clone)]
pub struct KdfVector {
    pub name: &'static str,
    pub passphrase: &'static str,
    /// Salt (hex), if any.
    pub salt: Option<&'static str>,
    pub hash: KdfHash,
    pub count: usize,
    pub key_len: usize,
    pub iv_len: usize,
    /// Expected key (hex).
    pub expected_key: &'static str,
    /// Expected IV (hex).
    pub expected_iv: &'static str,
}

impl KdfVector {
    pub fn params(&self) -> KdfParams {
        KdfParams::pem(self.key_len, self.iv_len)
            .with_hash(self.hash)
            .with_count(self.count)
    }
}

/// Get all KDF vectors.
///
/// The salt `13F689619F77E4E5` is the first 8 bytes of the DEK-Info IV
/// `13F689619F77E4E55F68556C1A9FEEF8`.
pub fn kdf_vectors() -> Vec<KdfVector> {
    vec![
        KdfVector {
            name: "AES-128-CBC, MD5, 1 round",
            passphrase: PASSPHRASE,
            salt: Some("13F689619F77E4E5"),
            hash: KdfHash::Md5,
            count: 1,
            key_len: 16,
            iv_len: 16,
            expected_key: "747783301f72d2ddbe5a19c8f1e08254",
            expected_iv: "fa5277af059220de3ca0f9a2d2c30a1d",
        },
        KdfVector {
            name: "AES-256-CBC, MD5, 1 round",
            passphrase: PASSPHRASE,
            salt: Some("13F689619F77E4E5"),
            hash: KdfHash::Md5,
            count: 1,
            key_len: 32,
            iv_len: 16,
            expected_key: "747783301f72d2ddbe5a19c8f1e08254fa5277af059220de3ca0f9a2d2c30a1d",
            expected_iv: "a0ed7665f278bdd69710ed632cb3917d",
        },
        KdfVector {
            name: "24/8 bytes, SHA-256, 3 rounds",
            passphrase: PASSPHRASE,
            salt: Some("13F689619F77E4E5"),
            hash: KdfHash::Sha256,
            count: 3,
            key_len: 24,
            iv_len: 8,
            expected_key: "67acfb16016a8a71f93a659481ce79b235988806a19bb926",
            expected_iv: "84bb401d75761235",
        },
        KdfVector {
            name: "SHA-1, unsalted",
            passphrase: PASSPHRASE,
            salt: None,
            hash: KdfHash::Sha1,
            count: 1,
            key_len: 16,
            iv_len: 16,
            expected_key: "fb15a1bc444e13e2c58a0a502c74a541",
            expected_iv: "06b5a0dc5491cc31cce1d033e6373170",
        },
    ]
}

/// Check one vector against the implementation.
pub fn verify_kdf_vector(vector: &KdfVector) -> bool {
    let salt = match vector.salt.map(hex::decode).transpose() {
        Ok(salt) => salt,
        Err(_) => return false,
    };

    match bytes_to_key(&vector.params(), vector.passphrase.as_bytes(), salt.as_deref()) {
        Ok(derived) => {
            hex::encode(&derived.key) == vector.expected_key
                && hex::encode(&derived.iv) == vector.expected_iv
        }
        Err(_) => false,
    }
}

/// Check every vector, returning `(name, passed)` pairs.
pub fn verify_all_vectors() -> Vec<(&'static str, bool)> {
    kdf_vectors()
        .iter()
        .map(|v| (v.name, verify_kdf_vector(v)))
        .collect()
}
