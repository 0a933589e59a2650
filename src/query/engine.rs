//! Two-hop verifiable join queries

use super::share::{SecretSharer, Share, XorSaltSharer};
use crate::model::{Fact, Hash};
use crate::trie::{prove_membership, Membership, TripleIndex};
use crate::{Error, Result};
use std::fmt;

/// Joined facts with their proofs, shares and an execution trace
///
/// `facts`, `shares` and `witnesses` are parallel: entry `i` of each belongs
/// to the same joined fact. `proof` is the concatenation of every witness
/// path in result order.
#[derive(Clone, Debug, Default)]
pub struct QueryResult {
    pub facts: Vec<Fact>,
    pub proof: Vec<Hash>,
    pub shares: Vec<Vec<Share>>,
    pub witnesses: Vec<Membership>,
    pub trace: Vec<String>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    fn push(&mut self, fact: Fact, witness: Membership, shares: Vec<Share>) {
        self.proof.extend_from_slice(witness.path());
        self.facts.push(fact);
        self.witnesses.push(witness);
        self.shares.push(shares);
    }

    /// Keep only results whose object is `object`, rebuilding the proof
    fn retain_object(&mut self, object: &Hash) {
        let facts = std::mem::take(&mut self.facts);
        let witnesses = std::mem::take(&mut self.witnesses);
        let shares = std::mem::take(&mut self.shares);
        self.proof.clear();

        for ((fact, witness), shares) in facts.into_iter().zip(witnesses).zip(shares) {
            if fact.triple.object == *object {
                self.push(fact, witness, shares);
            }
        }
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Query Execution Trace ===")?;
        for line in &self.trace {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)?;
        writeln!(f, "=== Results ===")?;
        for (i, fact) in self.facts.iter().enumerate() {
            writeln!(f, "Result {}: {}", i + 1, fact.payload)?;
            writeln!(
                f,
                "Proof size: {}, Shares: {}",
                self.witnesses.get(i).map_or(0, |w| w.path().len()),
                self.shares.get(i).map_or(0, Vec::len)
            )?;
        }
        Ok(())
    }
}

/// Runs `?s p1 ?o . ?o p2 ?x` joins over a triple index
pub struct QueryEngine<'a> {
    index: &'a TripleIndex,
    sharer: Box<dyn SecretSharer>,
}

impl<'a> QueryEngine<'a> {
    /// Engine sharing payloads with [`XorSaltSharer`]
    pub fn new(index: &'a TripleIndex) -> Self {
        QueryEngine {
            index,
            sharer: Box::new(XorSaltSharer),
        }
    }

    /// Replace the share scheme
    pub fn with_sharer(mut self, sharer: impl SecretSharer + 'static) -> Self {
        self.sharer = Box::new(sharer);
        self
    }

    /// Two-hop join from `subject` through `predicate1` then `predicate2`
    ///
    /// Every joined fact gets a membership proof for its subject hash and
    /// one share per party.
    pub fn query<P: AsRef<str>>(
        &self,
        subject: &str,
        predicate1: &str,
        predicate2: &str,
        parties: &[P],
    ) -> Result<QueryResult> {
        let parties: Vec<String> = parties.iter().map(|p| p.as_ref().to_string()).collect();
        let mut result = QueryResult {
            trace: vec![format!("Step 1: Match triples with subject = '{}'", subject)],
            ..Default::default()
        };

        let step1 = self.index.lookup(&Hash::of_term(subject));
        if step1.is_empty() {
            return Err(Error::NotFound("no result in step 1".into()));
        }
        result
            .trace
            .push(format!("Found {} triples in step 1", step1.len()));
        log::debug!("query {}: {} step 1 candidates", subject, step1.len());

        let first_hop = Hash::of_term(predicate1);
        let second_hop = Hash::of_term(predicate2);

        for first in step1.iter().filter(|f| f.triple.predicate == first_hop) {
            let join_key = first.triple.object;
            result
                .trace
                .push(format!("Joining on object: {}", join_key.to_hex()));

            let step2 = self.index.lookup(&join_key);
            for joined in step2.iter().filter(|f| f.triple.predicate == second_hop) {
                let witness = prove_membership(self.index, &joined.triple.subject);
                let shares = self.sharer.split(joined.payload.as_bytes(), &parties)?;
                result.trace.push(format!("Joined: {}", joined.payload));
                result.push(joined.clone(), witness, shares);
            }
        }

        if result.is_empty() {
            return Err(Error::NotFound("join produced no result".into()));
        }
        log::debug!("query {}: {} joined results", subject, result.len());
        Ok(result)
    }

    /// [`query`](Self::query) followed by `FILTER (?x = filter_term)`
    ///
    /// Errors from the base query propagate unchanged.
    pub fn extended_query<P: AsRef<str>>(
        &self,
        subject: &str,
        predicate1: &str,
        predicate2: &str,
        filter_term: &str,
        parties: &[P],
    ) -> Result<QueryResult> {
        let mut result = self.query(subject, predicate1, predicate2, parties)?;

        result.retain_object(&Hash::of_term(filter_term));
        result.trace.push(format!(
            "Applied FILTER ?o = '{}' -> {} matches",
            filter_term,
            result.len()
        ));

        if result.is_empty() {
            return Err(Error::NotFound("filter produced no result".into()));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::verify;

    fn nft_index() -> TripleIndex {
        let mut index = TripleIndex::in_memory();
        index.insert(Fact::from_terms("Bob", "owns", "NFT123", "Bob owns NFT123"));
        index.insert(Fact::from_terms("NFT123", "type", "Art", "NFT123 is Art"));
        index.insert(Fact::from_terms("NFT123", "creator", "Alice", "NFT123 created by Alice"));
        index
    }

    const PARTIES: [&str; 3] = ["p1", "p2", "p3"];

    #[test]
    fn test_two_hop_join() {
        let index = nft_index();
        let result = QueryEngine::new(&index)
            .query("Bob", "owns", "type", &PARTIES)
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.facts[0].payload, "NFT123 is Art");
        assert_eq!(result.shares.len(), 1);
        assert_eq!(result.shares[0].len(), 3);
        assert_eq!(result.shares[0][1].owner, "p2");
        assert!(!result.proof.is_empty());
    }

    #[test]
    fn test_witness_verifies_against_root() {
        let index = nft_index();
        let result = QueryEngine::new(&index)
            .query("Bob", "owns", "type", &PARTIES)
            .unwrap();

        let Membership::Found(proof) = &result.witnesses[0] else {
            panic!("joined subject must be indexed");
        };
        let leaf = index.bucket(&Hash::of_term("NFT123")).unwrap().digest();
        assert!(verify(proof, &index.root_digest(), &leaf));
        assert_eq!(result.proof, proof.path);
    }

    #[test]
    fn test_trace_records_each_step() {
        let index = nft_index();
        let result = QueryEngine::new(&index)
            .query("Bob", "owns", "type", &PARTIES)
            .unwrap();

        assert_eq!(result.trace[0], "Step 1: Match triples with subject = 'Bob'");
        assert_eq!(result.trace[1], "Found 1 triples in step 1");
        assert!(result.trace[2].starts_with("Joining on object: "));
        assert_eq!(result.trace.last().unwrap(), "Joined: NFT123 is Art");
    }

    #[test]
    fn test_unknown_subject_fails_in_step_one() {
        let index = nft_index();
        let err = QueryEngine::new(&index)
            .query("Zed", "owns", "type", &PARTIES)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(ref m) if m == "no result in step 1"));
    }

    #[test]
    fn test_missing_second_hop_fails_join() {
        let mut index = TripleIndex::in_memory();
        index.insert(Fact::from_terms("Charlie", "owns", "NFT456", "Charlie owns NFT456"));

        let err = QueryEngine::new(&index)
            .query("Charlie", "owns", "type", &["OrgX", "OrgY"])
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(ref m) if m == "join produced no result"));
    }

    #[test]
    fn test_wrong_first_predicate_fails_join() {
        let index = nft_index();
        let err = QueryEngine::new(&index)
            .query("Bob", "sold", "type", &PARTIES)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_extended_query_filters_object() {
        let index = nft_index();
        let engine = QueryEngine::new(&index);

        let result = engine
            .extended_query("Bob", "owns", "type", "Art", &PARTIES)
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(
            result.trace.last().unwrap(),
            "Applied FILTER ?o = 'Art' -> 1 matches"
        );

        let err = engine
            .extended_query("Bob", "owns", "type", "Music", &PARTIES)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(ref m) if m == "filter produced no result"));
    }

    #[test]
    fn test_filter_drops_some_results() {
        let mut index = nft_index();
        index.insert(Fact::from_terms("NFT123", "type", "Sculpture", "NFT123 is Sculpture"));
        index.insert(Fact::from_terms("Bob", "owns", "NFT9", "Bob owns NFT9"));
        index.insert(Fact::from_terms("NFT9", "type", "Art", "NFT9 is Art"));
        let engine = QueryEngine::new(&index);

        let base = engine.query("Bob", "owns", "type", &PARTIES).unwrap();
        assert_eq!(base.len(), 3);

        let result = engine
            .extended_query("Bob", "owns", "type", "Art", &PARTIES)
            .unwrap();
        let payloads: Vec<&str> = result.facts.iter().map(|f| f.payload.as_str()).collect();
        assert_eq!(payloads, vec!["NFT123 is Art", "NFT9 is Art"]);
        assert_eq!(result.shares.len(), result.facts.len());
        assert_eq!(result.witnesses.len(), result.facts.len());

        let kept: Vec<Hash> = result
            .witnesses
            .iter()
            .flat_map(|w| w.path().iter().copied())
            .collect();
        assert_eq!(result.proof, kept);
        assert!(result.proof.len() < base.proof.len());
    }

    #[test]
    fn test_extended_query_propagates_base_failure() {
        let mut index = TripleIndex::in_memory();
        index.insert(Fact::from_terms("Charlie", "owns", "NFT456", "Charlie owns NFT456"));

        let err = QueryEngine::new(&index)
            .extended_query("Charlie", "owns", "type", "Art", &["OrgX"])
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(ref m) if m == "join produced no result"));
    }

    #[test]
    fn test_custom_sharer() {
        struct Broadcast;
        impl SecretSharer for Broadcast {
            fn split(&self, payload: &[u8], parties: &[String]) -> Result<Vec<Share>> {
                Ok(parties
                    .iter()
                    .map(|p| Share {
                        owner: p.clone(),
                        value: payload.to_vec(),
                    })
                    .collect())
            }
        }

        let index = nft_index();
        let result = QueryEngine::new(&index)
            .with_sharer(Broadcast)
            .query("Bob", "owns", "type", &["only"])
            .unwrap();
        assert_eq!(result.shares[0][0].value, b"NFT123 is Art".to_vec());
    }

    #[test]
    fn test_display_report() {
        let index = nft_index();
        let report = QueryEngine::new(&index)
            .query("Bob", "owns", "type", &PARTIES)
            .unwrap()
            .to_string();

        assert!(report.contains("=== Query Execution Trace ==="));
        assert!(report.contains("Result 1: NFT123 is Art"));
        assert!(report.contains("Proof size: 1, Shares: 3"));
    }
}
