//! Triple and fact types

use super::{Hash, HASH_LEN};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A subject/predicate/object triple, each component held as a digest
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Hash,
    pub predicate: Hash,
    pub object: Hash,
}

impl Triple {
    /// Create a triple from already-hashed components
    pub fn new(subject: Hash, predicate: Hash, object: Hash) -> Self {
        Triple {
            subject,
            predicate,
            object,
        }
    }

    /// Create a triple by hashing three textual terms
    pub fn from_terms(subject: &str, predicate: &str, object: &str) -> Self {
        Triple::new(
            Hash::of_term(subject),
            Hash::of_term(predicate),
            Hash::of_term(object),
        )
    }

    /// The three component hashes in subject, predicate, object order
    pub fn components(&self) -> [Hash; 3] {
        [self.subject, self.predicate, self.object]
    }

    /// Concatenated component bytes, as fed to node digests
    pub fn to_bytes(&self) -> [u8; 3 * HASH_LEN] {
        let mut out = [0u8; 3 * HASH_LEN];
        out[..HASH_LEN].copy_from_slice(self.subject.as_bytes());
        out[HASH_LEN..2 * HASH_LEN].copy_from_slice(self.predicate.as_bytes());
        out[2 * HASH_LEN..].copy_from_slice(self.object.as_bytes());
        out
    }
}

/// A triple paired with its human-readable statement
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub triple: Triple,
    pub payload: String,
}

impl Fact {
    pub fn new(triple: Triple, payload: impl Into<String>) -> Self {
        Fact {
            triple,
            payload: payload.into(),
        }
    }

    /// Build a fact from textual terms
    pub fn from_terms(
        subject: &str,
        predicate: &str,
        object: &str,
        payload: impl Into<String>,
    ) -> Self {
        Fact::new(Triple::from_terms(subject, predicate, object), payload)
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.payload)
    }
}
