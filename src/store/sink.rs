//! Key-value sink abstraction
//!
//! The index writes each bucket's `key → digest` pair through a sink after
//! every mutation. The index never reads these entries back; sinks exist for
//! external auditing and tooling.

use crate::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Write-only destination for `key → digest` pairs
pub trait KeyValueSink: Send + Sync {
    /// Store `value` under `key`, overwriting any previous value
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
}

/// A sink that discards every write
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl KeyValueSink for NullSink {
    fn put(&self, _key: &[u8], _value: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// An in-memory sink, readable for tests and tooling
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
    writes: RwLock<u64>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest value written for `key`
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }

    /// Number of distinct keys written
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Total number of `put` calls received
    pub fn write_count(&self) -> u64 {
        *self.writes.read()
    }
}

impl KeyValueSink for MemorySink {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_vec(), value.to_vec());
        *self.writes.write() += 1;
        Ok(())
    }
}
