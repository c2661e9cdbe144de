//! Storage engine capabilities
//!
//! The managed query layer consumes a storage engine through two traits:
//! - [`Array`]: an open handle exposing its schema and creating queries
//! - [`Query`]: layout, condition, subarray, buffer binding, submission,
//!   status and finalize
//!
//! Value types shared by all engines live here as well. The [`memory`]
//! module provides an in-memory implementation.

mod binding;
mod capability;
mod condition;
mod errors;
mod scalar;
mod schema;
mod subarray;
mod types;

pub mod memory;

pub use binding::{BufferBinding, ColumnSource, ColumnTarget};
pub use capability::{Array, Query};
pub use condition::{ConditionOp, QueryCondition};
pub use errors::{EngineError, EngineResult};
pub use scalar::Scalar;
pub use schema::{ArraySchema, Attribute, ColumnInfo, Dimension};
pub use subarray::{Range, Subarray};
pub use types::{ArrayType, Datatype, Layout, QueryStatus, QueryType};
