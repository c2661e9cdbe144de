//! arrayquery - managed query sessions over multi-dimensional arrays
//!
//! Modules, leaves first:
//! - `engine`: storage engine capabilities and an in-memory engine
//! - `buffer`: column buffers with zero-copy typed views
//! - `config`: buffer synthesis and layout defaults
//! - `query`: the managed query session and its range selector
//! - `cli`: the `arrayq` command line

pub mod buffer;
pub mod cli;
pub mod config;
pub mod engine;
pub mod query;

pub use buffer::{BufferError, CellType, ColumnBuffer, ColumnBuffers};
pub use config::QueryConfig;
pub use query::{ErrorKind, ManagedQuery, RangeSelector, SessionError, SessionResult, SessionState};
