//! Node cipher: AES-CBC with PKCS#7 padding
//!
//! Key and IV come from a [`KeyDerivation`] strategy. The default strategy,
//! [`KeyPrefixIv`], takes the IV from the key material itself. That reuse is
//! a known weakness (equal plaintext prefixes produce equal ciphertext
//! prefixes under the same seed); it is kept for compatibility with existing
//! exports. A strategy with an independent random IV per node has to carry
//! the IV alongside each ciphertext, which changes the export format.

use crate::{Error, Result};
use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use sha2::{Digest, Sha256};

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Length of keys produced by [`KeyPrefixIv`] (AES-128)
pub const DERIVED_KEY_LEN: usize = 16;

/// Turns a caller-supplied seed into cipher key material
pub trait KeyDerivation: Send + Sync {
    /// Derive the symmetric key for `seed`
    fn derive_key(&self, seed: &[u8]) -> Vec<u8>;

    /// Derive the chaining IV for `key`
    fn derive_iv(&self, key: &[u8]) -> Result<[u8; BLOCK_SIZE]>;
}

/// `SHA-256(seed)[..16]` as key, and the key's first block as IV
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyPrefixIv;

impl KeyDerivation for KeyPrefixIv {
    fn derive_key(&self, seed: &[u8]) -> Vec<u8> {
        Sha256::digest(seed)[..DERIVED_KEY_LEN].to_vec()
    }

    fn derive_iv(&self, key: &[u8]) -> Result<[u8; BLOCK_SIZE]> {
        key.get(..BLOCK_SIZE)
            .and_then(|prefix| prefix.try_into().ok())
            .ok_or_else(|| {
                Error::KeyDerivation(format!(
                    "key of {} bytes is shorter than one block",
                    key.len()
                ))
            })
    }
}

/// Key and IV ready for encrypting node content
#[derive(Clone)]
pub struct NodeCipher {
    key: Vec<u8>,
    iv: [u8; BLOCK_SIZE],
}

impl NodeCipher {
    /// Build from explicit key material; the key must be 16, 24 or 32 bytes
    pub fn new(key: &[u8], iv: [u8; BLOCK_SIZE]) -> Result<Self> {
        check_key_len(key.len())?;
        Ok(NodeCipher {
            key: key.to_vec(),
            iv,
        })
    }

    /// Derive key and IV from `seed`
    pub fn from_seed(derivation: &dyn KeyDerivation, seed: &[u8]) -> Result<Self> {
        let key = derivation.derive_key(seed);
        let iv = derivation.derive_iv(&key)?;
        Self::new(&key, iv)
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        encrypt(plaintext, &self.key, &self.iv)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        decrypt(ciphertext, &self.key, &self.iv)
    }
}

impl std::fmt::Debug for NodeCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeCipher")
            .field("key_len", &self.key.len())
            .finish_non_exhaustive()
    }
}

fn check_key_len(len: usize) -> Result<()> {
    match len {
        16 | 24 | 32 => Ok(()),
        n => Err(Error::KeyDerivation(format!(
            "invalid AES key length: {} bytes",
            n
        ))),
    }
}

fn invalid_length(e: impl std::fmt::Display) -> Error {
    Error::KeyDerivation(e.to_string())
}

/// Encrypt with AES-CBC, padding to a whole number of blocks
pub fn encrypt(plaintext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    check_key_len(key.len())?;
    let ciphertext = match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(invalid_length)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(invalid_length)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        _ => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(invalid_length)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
    };
    Ok(ciphertext)
}

/// Decrypt AES-CBC ciphertext and strip its padding
pub fn decrypt(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    check_key_len(key.len())?;
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(Error::Format(format!(
            "ciphertext length {} is not a multiple of the block size",
            ciphertext.len()
        )));
    }

    let plaintext = match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(invalid_length)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(invalid_length)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
        _ => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(invalid_length)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext),
    };
    plaintext.map_err(|_| Error::Format("invalid padding".into()))
}
