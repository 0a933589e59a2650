//! Payload shares handed to query recipients
//!
//! [`XorSaltSharer`] is a placeholder, not a threshold scheme: every share is
//! the payload digest XORed with a public one-byte salt, so any single share
//! recovers the digest. It is kept so results stay comparable with existing
//! consumers. A real scheme can be dropped in behind [`SecretSharer`].

use crate::model::Hash;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// One party's share of a result payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub owner: String,
    #[serde(with = "crate::model::hex_bytes")]
    pub value: Vec<u8>,
}

/// Splits a payload into one share per party
pub trait SecretSharer: Send + Sync {
    fn split(&self, payload: &[u8], parties: &[String]) -> Result<Vec<Share>>;
}

/// `SHA-256(payload) XOR i` for party `i`, counting from 1
///
/// Salts are a single byte, so `split` fails with [`Error::InvalidParties`]
/// for more than [`MAX_PARTIES`](Self::MAX_PARTIES) parties instead of
/// wrapping the 256th salt to zero, which would hand out the bare digest.
#[derive(Clone, Copy, Debug, Default)]
pub struct XorSaltSharer;

impl XorSaltSharer {
    /// Largest party count whose salts fit in one byte without wrapping to zero
    pub const MAX_PARTIES: usize = u8::MAX as usize;

    /// Undo the salt of the share at `position` (0-based), yielding the payload digest
    pub fn recover(share: &Share, position: usize) -> Option<Hash> {
        let salt = salt_for(position)?;
        Hash::from_slice(&xor_with_salt(&share.value, salt))
    }
}

impl SecretSharer for XorSaltSharer {
    fn split(&self, payload: &[u8], parties: &[String]) -> Result<Vec<Share>> {
        if parties.len() > Self::MAX_PARTIES {
            return Err(Error::InvalidParties(format!(
                "{} parties given, at most {} supported",
                parties.len(),
                Self::MAX_PARTIES
            )));
        }

        let digest = Hash::digest(payload);
        Ok(parties
            .iter()
            .enumerate()
            .filter_map(|(i, party)| {
                let salt = salt_for(i)?;
                Some(Share {
                    owner: party.clone(),
                    value: xor_with_salt(digest.as_bytes(), salt),
                })
            })
            .collect())
    }
}

fn salt_for(position: usize) -> Option<u8> {
    u8::try_from(position + 1).ok()
}

fn xor_with_salt(input: &[u8], salt: u8) -> Vec<u8> {
    input.iter().map(|b| b ^ salt).collect()
}
