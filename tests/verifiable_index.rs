//! End-to-end scenarios over the public library API

use pistis_db::snapshot::BLOCK_SIZE;
use pistis_db::{
    prove_membership, verify, Error, Fact, Hash, MemorySink, QueryEngine, SnapshotEncryptor,
    TripleIndex, XorSaltSharer,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn nft_facts() -> Vec<Fact> {
    vec![
        Fact::from_terms("Bob", "owns", "NFT123", "Bob owns NFT123"),
        Fact::from_terms("NFT123", "type", "Art", "NFT123 is Art"),
        Fact::from_terms("NFT123", "creator", "Alice", "NFT123 created by Alice"),
    ]
}

#[test]
fn test_lookup_scenario() {
    let mut index = TripleIndex::in_memory();
    index.insert(Fact::from_terms("Alice", "knows", "Bob", "Alice knows Bob"));
    index.insert(Fact::from_terms("Bob", "likes", "Pizza", "Bob likes Pizza"));
    index.insert(Fact::from_terms("Alice", "likes", "Music", "Alice likes Music"));

    assert_eq!(index.lookup_term("Alice").len(), 2);
    assert_eq!(index.lookup_term("likes").len(), 2);

    let pizza = index.lookup_term("Pizza");
    assert_eq!(pizza.len(), 1);
    assert_eq!(pizza[0].payload, "Bob likes Pizza");
}

#[test]
fn test_rebuild_gives_same_root() {
    let first = TripleIndex::from_facts(nft_facts(), Arc::new(MemorySink::new()));
    let second = TripleIndex::from_facts(nft_facts(), Arc::new(MemorySink::new()));
    assert_eq!(first.root_digest(), second.root_digest());
}

#[test]
fn test_join_query_scenario() {
    let index = TripleIndex::from_facts(nft_facts(), Arc::new(MemorySink::new()));
    let result = QueryEngine::new(&index)
        .query("Bob", "owns", "type", &["p1", "p2", "p3"])
        .unwrap();

    assert_eq!(result.facts.len(), 1);
    assert_eq!(result.shares[0].len(), 3);
    assert!(!result.proof.is_empty());

    let digest = Hash::digest(result.facts[0].payload.as_bytes());
    for (i, share) in result.shares[0].iter().enumerate() {
        let unsalted: Vec<u8> = share.value.iter().map(|b| b ^ (i as u8 + 1)).collect();
        assert_eq!(unsalted, digest.as_bytes().to_vec());
        assert_eq!(XorSaltSharer::recover(share, i), Some(digest));
    }
}

#[test]
fn test_join_failure_scenario() {
    let mut index = TripleIndex::in_memory();
    index.insert(Fact::from_terms("Charlie", "owns", "NFT456", "Charlie owns NFT456"));

    let engine = QueryEngine::new(&index);
    assert!(matches!(
        engine.query("Charlie", "owns", "type", &["OrgX", "OrgY"]),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        engine.extended_query("Charlie", "owns", "type", "Art", &["OrgX", "OrgY"]),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_query_proofs_verify_until_index_changes() {
    let mut index = TripleIndex::from_facts(nft_facts(), Arc::new(MemorySink::new()));
    let root = index.root_digest();
    let leaf = index.bucket(&Hash::of_term("NFT123")).unwrap().digest();

    let witness = {
        let result = QueryEngine::new(&index)
            .extended_query("Bob", "owns", "type", "Art", &["p1"])
            .unwrap();
        result.witnesses[0].clone().into_proof().unwrap()
    };
    assert!(verify(&witness, &root, &leaf));

    index.insert(Fact::from_terms("Art", "genre", "Modern", "Art is Modern"));
    assert!(!verify(&witness, &index.root_digest(), &leaf));

    let fresh = prove_membership(&index, &Hash::of_term("NFT123"))
        .into_proof()
        .unwrap();
    assert!(verify(&fresh, &index.root_digest(), &leaf));
}

#[test]
fn test_encrypted_export_scenario() {
    let index = TripleIndex::from_facts(nft_facts(), Arc::new(MemorySink::new()));
    let encryptor = SnapshotEncryptor::new();
    let records = encryptor
        .export(&index, b"encryption-seed", &mut StdRng::seed_from_u64(2024))
        .unwrap();

    assert_eq!(records.len(), 1 + index.bucket_count());
    assert!(records.iter().all(|r| r.ciphertext.len() % BLOCK_SIZE == 0));

    let art = index.bucket(&Hash::of_term("Art")).unwrap();
    let record = records.iter().find(|r| r.digest == art.digest()).unwrap();
    let plaintext = encryptor.decrypt_node(record, b"encryption-seed").unwrap();
    assert_eq!(plaintext, art.content_bytes());

    let mut ragged = record.clone();
    ragged.ciphertext.pop();
    assert!(matches!(
        encryptor.decrypt_node(&ragged, b"encryption-seed"),
        Err(Error::Format(_))
    ));
}

#[test]
fn test_sink_tracks_every_bucket() {
    let sink = Arc::new(MemorySink::new());
    let index = TripleIndex::from_facts(nft_facts(), sink.clone());

    assert_eq!(sink.len(), index.bucket_count());
    for node in index.buckets() {
        let key = node.key().unwrap();
        assert_eq!(sink.get(key.as_bytes()), Some(node.digest().as_bytes().to_vec()));
    }
}
