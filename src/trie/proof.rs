//! Membership proofs over the triple index

use super::{aggregate, IndexNode, NodeId, TripleIndex};
use crate::model::{Hash, Triple};

/// Preimage of one ancestor on a proof path, minus the digest being proven
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofLevel {
    pub key: Option<Hash>,
    pub triples: Vec<Triple>,
    /// Child digests before the one on the path
    pub left: Vec<Hash>,
    /// Child digests after the one on the path
    pub right: Vec<Hash>,
}

impl ProofLevel {
    fn for_child(node: &IndexNode, slot: usize) -> Self {
        let digests = node.child_digests();
        ProofLevel {
            key: node.key().copied(),
            triples: node.facts().iter().map(|f| f.triple).collect(),
            left: digests[..slot].to_vec(),
            right: digests[slot + 1..].to_vec(),
        }
    }

    /// Digest of this ancestor given the digest of the child on the path
    pub fn fold(&self, child: Hash) -> Hash {
        let mut children = Vec::with_capacity(self.left.len() + 1 + self.right.len());
        children.extend_from_slice(&self.left);
        children.push(child);
        children.extend_from_slice(&self.right);

        let key: &[u8] = match &self.key {
            Some(key) => key.as_bytes(),
            None => &[],
        };
        aggregate(key, &self.triples, &children)
    }
}

/// Proof that a keyed node is reachable from the root
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MembershipProof {
    pub target: Hash,
    /// Child digests along the path from the root, ending with the target's digest
    pub path: Vec<Hash>,
    /// Ancestors from the root down to the target's parent
    pub levels: Vec<ProofLevel>,
}

impl MembershipProof {
    /// Digest of the proven node
    pub fn leaf_digest(&self) -> Option<Hash> {
        self.path.last().copied()
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Check this proof against a root digest
    pub fn verify(&self, root_digest: &Hash, leaf_digest: &Hash) -> bool {
        verify(self, root_digest, leaf_digest)
    }
}

/// Outcome of a membership search
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Membership {
    Found(MembershipProof),
    Absent,
}

impl Membership {
    pub fn is_found(&self) -> bool {
        matches!(self, Membership::Found(_))
    }

    /// Digest path, empty when the target is absent
    pub fn path(&self) -> &[Hash] {
        match self {
            Membership::Found(proof) => &proof.path,
            Membership::Absent => &[],
        }
    }

    pub fn into_proof(self) -> Option<MembershipProof> {
        match self {
            Membership::Found(proof) => Some(proof),
            Membership::Absent => None,
        }
    }
}

/// Prove that the node keyed by `target` is part of `index`
///
/// Depth-first from the root in child order; the first path reaching a node
/// with key `target` wins.
pub fn prove_membership(index: &TripleIndex, target: &Hash) -> Membership {
    let mut path = Vec::new();
    let mut levels = Vec::new();

    if search(index, NodeId::ROOT, target, &mut path, &mut levels) {
        Membership::Found(MembershipProof {
            target: *target,
            path,
            levels,
        })
    } else {
        Membership::Absent
    }
}

fn search(
    index: &TripleIndex,
    id: NodeId,
    target: &Hash,
    path: &mut Vec<Hash>,
    levels: &mut Vec<ProofLevel>,
) -> bool {
    let Some(node) = index.node(id) else {
        return false;
    };

    for (slot, child_id) in node.children().iter().enumerate() {
        let Some(child) = index.node(*child_id) else {
            continue;
        };

        levels.push(ProofLevel::for_child(node, slot));
        if child.key() == Some(target) {
            path.push(child.digest());
            return true;
        }

        path.push(node.child_digests()[slot]);
        if search(index, *child_id, target, path, levels) {
            return true;
        }
        path.pop();
        levels.pop();
    }
    false
}

/// Recompute the root digest from `leaf_digest` along `proof`
///
/// Each step checks that the running digest matches the claimed path entry
/// before folding it into the parent's preimage.
pub fn verify(proof: &MembershipProof, root_digest: &Hash, leaf_digest: &Hash) -> bool {
    if proof.path.is_empty() || proof.path.len() != proof.levels.len() {
        return false;
    }
    if proof.leaf_digest() != Some(*leaf_digest) {
        return false;
    }

    let mut current = *leaf_digest;
    for (level, claimed) in proof.levels.iter().zip(&proof.path).rev() {
        if current != *claimed {
            return false;
        }
        current = level.fold(current);
    }
    current == *root_digest
}
