//! Index node types and the digest aggregator

use crate::model::{Fact, Hash, Triple};
use sha2::{Digest, Sha256};

/// Position of a node in the index arena
///
/// Parents are referenced by id rather than by pointer, so a node never owns
/// or borrows its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The root node is always the first arena slot
    pub const ROOT: NodeId = NodeId(0);
}

/// Digest of a node from its parts
///
/// `SHA-256(key ‖ subject ‖ predicate ‖ object for each triple ‖ child digests)`,
/// with triples and children in their stored order.
pub fn aggregate<'a>(
    key: &[u8],
    triples: impl IntoIterator<Item = &'a Triple>,
    child_digests: &[Hash],
) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(key);
    for triple in triples {
        hasher.update(triple.subject.as_bytes());
        hasher.update(triple.predicate.as_bytes());
        hasher.update(triple.object.as_bytes());
    }
    for digest in child_digests {
        hasher.update(digest.as_bytes());
    }
    Hash::from_bytes(hasher.finalize().into())
}

/// A bucket of facts sharing one component hash
///
/// The root is the only node without a key; its children are the buckets.
#[derive(Clone, Debug)]
pub struct IndexNode {
    pub(crate) key: Option<Hash>,
    pub(crate) parent: Option<NodeId>,
    /// Slot of this node in its parent's `children`
    pub(crate) slot: usize,
    pub(crate) children: Vec<NodeId>,
    pub(crate) child_digests: Vec<Hash>,
    pub(crate) facts: Vec<Fact>,
    pub(crate) digest: Hash,
}

impl IndexNode {
    /// Create the keyless root
    pub(crate) fn root() -> Self {
        let mut node = IndexNode {
            key: None,
            parent: None,
            slot: 0,
            children: Vec::new(),
            child_digests: Vec::new(),
            facts: Vec::new(),
            digest: Hash::ZERO,
        };
        node.digest = node.compute_digest();
        node
    }

    /// Create an empty bucket under `parent`
    pub(crate) fn bucket(key: Hash, parent: NodeId, slot: usize) -> Self {
        let mut node = IndexNode {
            key: Some(key),
            parent: Some(parent),
            slot,
            children: Vec::new(),
            child_digests: Vec::new(),
            facts: Vec::new(),
            digest: Hash::ZERO,
        };
        node.digest = node.compute_digest();
        node
    }

    /// Recompute this node's digest from its current content
    ///
    /// Relies on `child_digests` being current; the index refreshes children
    /// before their parents.
    pub fn compute_digest(&self) -> Hash {
        aggregate(
            self.key_bytes(),
            self.facts.iter().map(|f| &f.triple),
            &self.child_digests,
        )
    }

    pub fn key(&self) -> Option<&Hash> {
        self.key.as_ref()
    }

    /// Key bytes as fed to the digest (empty for the root)
    pub fn key_bytes(&self) -> &[u8] {
        match &self.key {
            Some(key) => key.as_bytes(),
            None => &[],
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child_digests(&self) -> &[Hash] {
        &self.child_digests
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    pub fn digest(&self) -> Hash {
        self.digest
    }

    /// Serialized content used for encrypted export:
    /// key, then each fact's three hashes followed by its payload
    pub fn content_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::from(self.key_bytes());
        for fact in &self.facts {
            buf.extend_from_slice(&fact.triple.to_bytes());
            buf.extend_from_slice(fact.payload.as_bytes());
        }
        buf
    }
}
