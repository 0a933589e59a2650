//! # pistis_db
//!
//! A verifiable index of subject/predicate/object facts.
//!
//! Every fact is indexed under the hash of each of its three components, and
//! every index node carries a digest over its content and its children, so
//! the whole index is summarised by one root digest.
//!
//! ## Core Concepts
//!
//! - **Buckets**: one node per component hash, holding every fact touching it
//! - **Membership proofs**: digest paths from the root to a bucket, with a verifier
//! - **Encrypted snapshots**: shuffled, seed-keyed ciphertexts of each node
//! - **Join queries**: two-hop joins returning proofs and per-party payload shares
//!
//! ## Example
//!
//! ```
//! use pistis_db::{Fact, QueryEngine, TripleIndex};
//!
//! let mut index = TripleIndex::in_memory();
//! index.insert(Fact::from_terms("Bob", "owns", "NFT123", "Bob owns NFT123"));
//! index.insert(Fact::from_terms("NFT123", "type", "Art", "NFT123 is Art"));
//!
//! let result = QueryEngine::new(&index)
//!     .query("Bob", "owns", "type", &["p1", "p2"])
//!     .unwrap();
//! assert_eq!(result.facts[0].payload, "NFT123 is Art");
//! ```

pub mod config;
pub mod model;
pub mod query;
pub mod snapshot;
pub mod store;
pub mod trie;

mod error;

pub use config::{Config, SinkConfig};
pub use error::{Error, Result};
pub use model::{Fact, Hash, Triple};
pub use query::{QueryEngine, QueryResult, SecretSharer, Share, XorSaltSharer};
pub use snapshot::{EncryptedNode, KeyDerivation, KeyPrefixIv, SnapshotEncryptor};
pub use store::{FactLog, FactRecord, FileSink, KeyValueSink, MemorySink, NullSink};
pub use trie::{prove_membership, verify, Membership, MembershipProof, TripleIndex};

/// Sink file format version
pub const VERSION: u32 = 1;

/// Magic bytes for sink file identification
pub const MAGIC: &[u8; 8] = b"PISTISKV";
