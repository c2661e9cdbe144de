//! Capabilities a storage engine provides to the managed query layer

use std::fmt;
use std::sync::Arc;

use super::binding::{ColumnSource, ColumnTarget};
use super::condition::QueryCondition;
use super::errors::EngineResult;
use super::schema::ArraySchema;
use super::subarray::Subarray;
use super::types::{Datatype, Layout, QueryStatus, QueryType};

/// An open array handle
///
/// Handles are shared: several sessions may query one handle concurrently.
pub trait Array: Send + Sync + fmt::Debug {
    /// Location of the array
    fn uri(&self) -> &str;

    /// Schema of the array
    fn schema(&self) -> Arc<ArraySchema>;

    /// Mode the handle was opened in
    fn mode(&self) -> QueryType;

    /// Creates a query of the handle's mode
    fn new_query(&self) -> EngineResult<Box<dyn Query>>;
}

/// An engine query bound to one array
///
/// A read query keeps an internal cursor: after an `Incomplete` submission,
/// the next submission resumes where the previous one stopped.
pub trait Query: Send {
    fn query_type(&self) -> QueryType;

    /// Sets result order (reads) or input cell order (writes)
    fn set_layout(&mut self, layout: Layout) -> EngineResult<()>;

    fn layout(&self) -> Layout;

    /// Replaces the value filter
    fn set_condition(&mut self, condition: &QueryCondition) -> EngineResult<()>;

    fn set_subarray(&mut self, subarray: &Subarray) -> EngineResult<()>;

    /// Binds the data extent of `column`
    fn set_data_buffer(&mut self, column: &str, datatype: Datatype) -> EngineResult<()>;

    /// Binds the offsets extent of a variable-length column
    fn set_offsets_buffer(&mut self, column: &str) -> EngineResult<()>;

    /// Binds the validity extent of a nullable column
    fn set_validity_buffer(&mut self, column: &str) -> EngineResult<()>;

    /// Executes a read into `targets`, one per bound column
    fn submit_read(&mut self, targets: &mut [ColumnTarget<'_>]) -> EngineResult<QueryStatus>;

    /// Executes a write of `sources`, one per bound column
    fn submit_write(&mut self, sources: &[ColumnSource<'_>]) -> EngineResult<QueryStatus>;

    fn status(&self) -> QueryStatus;

    /// Signals that no further submissions follow
    fn finalize(&mut self) -> EngineResult<()>;
}
