//! Verifiable triple index
//!
//! This implements a hash-aggregating index where:
//! - Each bucket holds every fact touching one component hash
//! - Each node's digest covers its key, its facts and its children's digests
//! - The root digest uniquely identifies the indexed facts and their order

mod node;
mod proof;
mod tree;

pub use node::{aggregate, IndexNode, NodeId};
pub use proof::{prove_membership, verify, Membership, MembershipProof, ProofLevel};
pub use tree::TripleIndex;
