//! Storage collaborators
//!
//! Sinks receive `key → digest` pairs from the index as write-through
//! metadata. The fact log holds the CLI's statements between invocations.

mod fact_log;
mod file_store;
mod sink;

pub use fact_log::{FactLog, FactRecord};
pub use file_store::FileSink;
pub use sink::{KeyValueSink, MemorySink, NullSink};
