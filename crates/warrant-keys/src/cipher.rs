//! CBC block ciphers used by legacy encrypted PEM.

use std::fmt;
use std::str::FromStr;

use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockCipher, BlockDecryptMut, KeyIvInit};

use crate::error::{KeyError, Result};
use crate::kdf::KdfParams;

/// A cipher named in a `DEK-Info` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cipher {
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
    DesCbc,
    DesEde3Cbc,
}

impl Cipher {
    /// OpenSSL name.
    pub const fn name(&self) -> &'static str {
        match self {
            Cipher::Aes128Cbc => "AES-128-CBC",
            Cipher::Aes192Cbc => "AES-192-CBC",
            Cipher::Aes256Cbc => "AES-256-CBC",
            Cipher::DesCbc => "DES-CBC",
            Cipher::DesEde3Cbc => "DES-EDE3-CBC",
        }
    }

    pub const fn key_len(&self) -> usize {
        match self {
            Cipher::Aes128Cbc => 16,
            Cipher::Aes192Cbc => 24,
            Cipher::Aes256Cbc => 32,
            Cipher::DesCbc => 8,
            Cipher::DesEde3Cbc => 24,
        }
    }

    pub const fn iv_len(&self) -> usize {
        match self {
            Cipher::Aes128Cbc | Cipher::Aes192Cbc | Cipher::Aes256Cbc => 16,
            Cipher::DesCbc | Cipher::DesEde3Cbc => 8,
        }
    }

    /// Default KDF parameters for this cipher.
    pub const fn kdf_params(&self) -> KdfParams {
        KdfParams::pem(self.key_len(), self.iv_len())
    }

    /// Decrypt `data` and strip PKCS#7 padding.
    pub fn decrypt(&self, key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Cipher::Aes128Cbc => cbc_decrypt::<aes::Aes128>(key, iv, data),
            Cipher::Aes192Cbc => cbc_decrypt::<aes::Aes192>(key, iv, data),
            Cipher::Aes256Cbc => cbc_decrypt::<aes::Aes256>(key, iv, data),
            Cipher::DesCbc => cbc_decrypt::<des::Des>(key, iv, data),
            Cipher::DesEde3Cbc => cbc_decrypt::<des::TdesEde3>(key, iv, data),
        }
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Cipher {
    type Err = KeyError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AES-128-CBC" => Ok(Cipher::Aes128Cbc),
            "AES-192-CBC" => Ok(Cipher::Aes192Cbc),
            "AES-256-CBC" => Ok(Cipher::Aes256Cbc),
            "DES-CBC" => Ok(Cipher::DesCbc),
            "DES-EDE3-CBC" => Ok(Cipher::DesEde3Cbc),
            _ => Err(KeyError::UnsupportedCipher(s.to_string())),
        }
    }
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>>
where
    C: BlockCipher + BlockDecryptMut,
    cbc::Decryptor<C>: KeyIvInit + BlockDecryptMut,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| KeyError::Decrypt(format!("bad key or iv length: {}", e)))?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(data)
        .map_err(|_| KeyError::Decrypt("bad padding (wrong passphrase?)".into()))
}
