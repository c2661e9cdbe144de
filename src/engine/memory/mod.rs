//! In-memory reference engine
//!
//! Implements the engine capabilities over a cell list held in memory:
//! - range and condition filtering
//! - layout ordering
//! - paged reads that report `Incomplete` when buffers run out
//! - sparse and dense writes, with global-order writes deferred to finalize
//!
//! It has no persistence beyond loading JSON snapshots.

mod query;
mod snapshot;
mod store;

pub use query::MemQuery;
pub use snapshot::ArraySnapshot;
pub use store::{ArrayStore, MemArray};
