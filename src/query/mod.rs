//! Verifiable two-hop join queries
//!
//! Results carry a membership proof per joined fact and a set of payload
//! shares, one per receiving party.

mod engine;
mod share;

pub use engine::{QueryEngine, QueryResult};
pub use share::{SecretSharer, Share, XorSaltSharer};
