//! Encrypted snapshot export
//!
//! Each node's content is encrypted under a key derived from a caller-supplied
//! seed and emitted in a shuffled order, next to the node's plain digest.

mod cipher;
mod export;

pub use cipher::{
    decrypt, encrypt, KeyDerivation, KeyPrefixIv, NodeCipher, BLOCK_SIZE, DERIVED_KEY_LEN,
};
pub use export::{read_bundle, write_bundle, EncryptedNode, SnapshotEncryptor};
