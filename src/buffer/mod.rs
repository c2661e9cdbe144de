//! Column buffers
//!
//! Memory the managed query lends to the engine:
//! - [`ColumnBuffer`]: data, offsets and validity of one column
//! - [`ColumnBuffers`]: name-keyed collection shared with callers
//! - [`CellType`]: primitive types viewable in place

mod aligned;
mod collection;
mod column;
mod element;
mod errors;

pub use collection::ColumnBuffers;
pub use column::ColumnBuffer;
pub use element::CellType;
pub use errors::{BufferError, BufferResult};
