//! Test support: an in-memory [`Sink`](crate::template::Sink).
//!
//! Use [`MemorySink`] to materialize a compiled template without any real
//! node model, then inspect attributes, text, and call counts, or render the
//! result to compact markup for snapshot-style assertions.

pub mod memory;

pub use memory::{MemoryId, MemorySink};
