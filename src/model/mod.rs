//! Core data model types for pistis_db

mod hash;
mod triple;

pub use hash::{hex_bytes, Hash, HASH_LEN};
pub use triple::{Fact, Triple};
