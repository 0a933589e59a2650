//! Hash-keyed triple index with aggregated digests

use super::{IndexNode, NodeId};
use crate::model::{Fact, Hash};
use crate::store::{KeyValueSink, NullSink};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An index of facts keyed by the hash of each component
///
/// The structure is a single level deep: the root's children are buckets,
/// one per distinct component hash. Every fact is stored under its subject,
/// predicate and object hash so any role can be looked up directly.
///
/// Digests are recomputed from the touched bucket up to the root inside
/// every `insert`, so `root_digest` is never stale between calls.
pub struct TripleIndex {
    /// Node arena; the root lives at `NodeId::ROOT`
    nodes: Vec<IndexNode>,
    /// Component hash → bucket
    buckets: HashMap<Hash, NodeId>,
    /// Write-through destination for `key → digest`
    sink: Arc<dyn KeyValueSink>,
    /// Number of `insert` calls
    fact_count: usize,
}

impl TripleIndex {
    /// Create an empty index writing digests through `sink`
    pub fn new(sink: Arc<dyn KeyValueSink>) -> Self {
        TripleIndex {
            nodes: vec![IndexNode::root()],
            buckets: HashMap::new(),
            sink,
            fact_count: 0,
        }
    }

    /// Create an empty index that does not write digests anywhere
    pub fn in_memory() -> Self {
        Self::new(Arc::new(NullSink))
    }

    /// Build an index by inserting `facts` in iteration order
    pub fn from_facts(facts: impl IntoIterator<Item = Fact>, sink: Arc<dyn KeyValueSink>) -> Self {
        let mut index = Self::new(sink);
        for fact in facts {
            index.insert(fact);
        }
        index
    }

    /// Route future digest writes to `sink` and publish every bucket's
    /// current digest to it
    pub fn attach_sink(&mut self, sink: Arc<dyn KeyValueSink>) {
        self.sink = sink;
        for id in self.root().children() {
            self.persist(*id);
        }
    }

    /// Get the root digest
    pub fn root_digest(&self) -> Hash {
        self.root().digest()
    }

    pub fn root(&self) -> &IndexNode {
        &self.nodes[NodeId::ROOT.0]
    }

    /// Get a node by id
    pub fn node(&self, id: NodeId) -> Option<&IndexNode> {
        self.nodes.get(id.0)
    }

    /// Get the bucket keyed by `hash`
    pub fn bucket(&self, hash: &Hash) -> Option<&IndexNode> {
        self.buckets.get(hash).map(|id| &self.nodes[id.0])
    }

    /// Iterate the root's children in creation order
    pub fn buckets(&self) -> impl Iterator<Item = &IndexNode> {
        self.root().children().iter().map(|id| &self.nodes[id.0])
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Number of facts inserted (each counted once, not per bucket)
    pub fn fact_count(&self) -> usize {
        self.fact_count
    }

    pub fn is_empty(&self) -> bool {
        self.fact_count == 0
    }

    /// Insert a fact under each of its three component hashes
    pub fn insert(&mut self, fact: Fact) {
        for hash in fact.triple.components() {
            self.insert_into_bucket(hash, fact.clone());
        }
        self.fact_count += 1;
    }

    /// Facts in the bucket keyed exactly by `hash`; empty if there is none
    pub fn lookup(&self, hash: &Hash) -> &[Fact] {
        match self.bucket(hash) {
            Some(node) => node.facts(),
            None => &[],
        }
    }

    /// Hash a textual term and look it up
    pub fn lookup_term(&self, term: &str) -> &[Fact] {
        self.lookup(&Hash::of_term(term))
    }

    // === Internal helpers ===

    fn insert_into_bucket(&mut self, hash: Hash, fact: Fact) {
        let id = match self.buckets.get(&hash) {
            Some(id) => *id,
            None => self.create_bucket(NodeId::ROOT, hash),
        };
        self.nodes[id.0].facts.push(fact);
        self.refresh(id);
    }

    fn create_bucket(&mut self, parent: NodeId, key: Hash) -> NodeId {
        let id = NodeId(self.nodes.len());
        let slot = self.nodes[parent.0].children.len();
        let node = IndexNode::bucket(key, parent, slot);
        let digest = node.digest();
        self.nodes.push(node);

        let parent_node = &mut self.nodes[parent.0];
        parent_node.children.push(id);
        parent_node.child_digests.push(digest);
        self.buckets.insert(key, id);

        log::debug!("created bucket {} for key {}", id.0, key.short());
        id
    }

    /// Recompute digests from `id` up to the root
    fn refresh(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(cur) = current {
            let digest = self.nodes[cur.0].compute_digest();
            let node = &mut self.nodes[cur.0];
            node.digest = digest;
            let (parent, slot) = (node.parent, node.slot);
            log::trace!("node {} digest {}", cur.0, digest.short());

            self.persist(cur);
            if let Some(parent) = parent {
                self.nodes[parent.0].child_digests[slot] = digest;
            }
            current = parent;
        }
    }

    /// Best-effort write of a keyed node's digest to the sink
    fn persist(&self, id: NodeId) {
        let node = &self.nodes[id.0];
        if let Some(key) = node.key() {
            if let Err(e) = self.sink.put(key.as_bytes(), node.digest().as_bytes()) {
                log::warn!("sink write for {} failed: {}", key.short(), e);
            }
        }
    }
}

impl Default for TripleIndex {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for TripleIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TripleIndex")
            .field("root_digest", &self.root_digest())
            .field("buckets", &self.bucket_count())
            .field("facts", &self.fact_count)
            .finish()
    }
}
