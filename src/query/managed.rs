//! Managed query session
//!
//! Wraps one engine query over one array and hides its read protocol:
//! - column selection, where an empty selection reads every column
//! - range selection through a [`RangeSelector`]
//! - buffer attachment, with buffers synthesized for selected columns that
//!   have none at the first submission
//! - pagination: an `Incomplete` read is resubmitted into the same buffers
//!   and the session counts cells across pages
//!
//! Selection is only allowed before the first submission.

use std::sync::Arc;

use tracing::{debug, warn, Span};
use uuid::Uuid;

use crate::buffer::{BufferError, CellType, ColumnBuffer, ColumnBuffers};
use crate::config::QueryConfig;
use crate::engine::{
    Array, ArraySchema, ColumnSource, ColumnTarget, EngineError, Layout, Query, QueryCondition,
    QueryStatus, QueryType, Scalar,
};

use super::errors::{SessionError, SessionResult};
use super::selector::RangeSelector;
use super::state::SessionState;

/// Display name of sessions created without one
pub const UNNAMED: &str = "unnamed";

/// A query session bound to one array
///
/// Field order matters: the engine query is dropped before the array handle
/// it was created from.
pub struct ManagedQuery {
    query: Box<dyn Query>,
    selector: RangeSelector,
    buffers: Arc<ColumnBuffers>,
    schema: Arc<ArraySchema>,
    array: Arc<dyn Array>,
    name: String,
    id: Uuid,
    config: QueryConfig,
    /// Columns to read; empty means all
    columns: Vec<String>,
    /// False once any read returned Incomplete
    results_complete: bool,
    total_num_cells: usize,
    state: SessionState,
    span: Span,
}

impl ManagedQuery {
    /// Creates a session with the default configuration
    pub fn new(array: Arc<dyn Array>, name: impl Into<String>) -> SessionResult<Self> {
        Self::with_config(array, name, QueryConfig::default())
    }

    pub fn with_config(
        array: Arc<dyn Array>,
        name: impl Into<String>,
        config: QueryConfig,
    ) -> SessionResult<Self> {
        config.validate()?;

        let name = match name.into() {
            name if name.is_empty() => UNNAMED.to_string(),
            name => name,
        };
        let id = Uuid::new_v4();
        let span = tracing::debug_span!("managed_query", name = %name, id = %id);

        let schema = array.schema();
        let mut query = array.new_query()?;
        if query.query_type() == QueryType::Read {
            let layout = if schema.is_sparse() {
                config.sparse_layout
            } else {
                config.dense_layout
            };
            query.set_layout(layout)?;
        }

        span.in_scope(|| {
            debug!(
                uri = %array.uri(),
                mode = %query.query_type(),
                array_type = %schema.array_type(),
                "session created"
            )
        });

        Ok(Self {
            query,
            selector: RangeSelector::new(Arc::clone(&schema)),
            buffers: Arc::new(ColumnBuffers::new()),
            schema,
            array,
            name,
            id,
            config,
            columns: Vec::new(),
            results_complete: true,
            total_num_cells: 0,
            state: SessionState::Unsubmitted,
            span,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn array(&self) -> &Arc<dyn Array> {
        &self.array
    }

    pub fn schema(&self) -> Arc<ArraySchema> {
        Arc::clone(&self.schema)
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Columns selected so far; empty means all columns
    pub fn selected_columns(&self) -> &[String] {
        &self.columns
    }

    /// True once any range was selected
    pub fn is_range_set(&self) -> bool {
        self.selector.is_set()
    }

    /// Replaces the column selection.
    ///
    /// With `if_not_empty`, an existing non-empty selection is kept and the
    /// call does nothing.
    pub fn select_columns<S: AsRef<str>>(
        &mut self,
        names: &[S],
        if_not_empty: bool,
    ) -> SessionResult<()> {
        self.ensure_unsubmitted("select columns")?;
        if if_not_empty && !self.columns.is_empty() {
            return Ok(());
        }

        let mut columns: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if self.schema.column(name).is_none() {
                return Err(EngineError::UnknownColumn(name.to_string()).into());
            }
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
        self.columns = columns;
        Ok(())
    }

    /// Adds ranges on `dim`; ranges accumulate into a union
    pub fn select_ranges<T, I>(&mut self, dim: &str, ranges: I) -> SessionResult<()>
    where
        T: Into<Scalar>,
        I: IntoIterator<Item = (T, T)>,
    {
        self.ensure_unsubmitted("select ranges")?;
        self.selector.add_ranges(dim, ranges)?;
        Ok(())
    }

    /// Adds single coordinates on `dim`
    pub fn select_points<T, I>(&mut self, dim: &str, points: I) -> SessionResult<()>
    where
        T: Into<Scalar>,
        I: IntoIterator<Item = T>,
    {
        self.ensure_unsubmitted("select points")?;
        self.selector.add_points(dim, points)?;
        Ok(())
    }

    pub fn select_point(&mut self, dim: &str, point: impl Into<Scalar>) -> SessionResult<()> {
        self.ensure_unsubmitted("select points")?;
        self.selector.add_point(dim, point)?;
        Ok(())
    }

    /// Replaces the value filter
    pub fn set_condition(&mut self, condition: &QueryCondition) -> SessionResult<()> {
        self.ensure_unsubmitted("set a condition")?;
        self.query.set_condition(condition)?;
        Ok(())
    }

    pub fn set_layout(&mut self, layout: Layout) -> SessionResult<()> {
        self.ensure_unsubmitted("set the layout")?;
        self.query.set_layout(layout)?;
        Ok(())
    }

    /// Attaches `buffer` as the read target or write source of `name`.
    ///
    /// On dense arrays only attributes take buffers; other columns are
    /// skipped and `false` is returned. The data extent is always bound,
    /// offsets only for variable-length buffers and validity only for
    /// nullable ones.
    pub fn set_column_data(
        &mut self,
        name: &str,
        buffer: Arc<ColumnBuffer>,
    ) -> SessionResult<bool> {
        if self.state == SessionState::Finalized {
            return Err(self.violation("attach buffers"));
        }
        if self.state.is_submitted() && self.query.query_type() == QueryType::Read {
            match self.buffers.shared(name) {
                Some(current) if Arc::ptr_eq(current, &buffer) => return Ok(true),
                _ => return Err(self.violation("attach a new buffer")),
            }
        }

        if !(self.schema.is_sparse() || self.schema.has_attribute(name)) {
            debug!(
                parent: &self.span,
                column = name,
                "dense arrays take buffers for attributes only; skipped"
            );
            return Ok(false);
        }

        self.query.set_data_buffer(name, buffer.datatype())?;
        if buffer.is_var() {
            self.query.set_offsets_buffer(name)?;
        }
        if buffer.is_nullable() {
            self.query.set_validity_buffer(name)?;
        }

        debug!(
            parent: &self.span,
            column = name,
            datatype = %buffer.datatype(),
            var = buffer.is_var(),
            nullable = buffer.is_nullable(),
            "buffer attached"
        );
        Arc::make_mut(&mut self.buffers).insert(name, buffer);
        Ok(true)
    }

    /// Runs one read submission.
    ///
    /// Results are written from the start of every attached buffer, so the
    /// caller must drain them before resubmitting an `Incomplete` read.
    pub fn submit(&mut self) -> SessionResult<QueryStatus> {
        let span = self.span.clone();
        let _enter = span.enter();

        if self.query.query_type() != QueryType::Read {
            return Err(self.violation("submit a read on a write session"));
        }
        self.ensure_buffers_free()?;
        let expanded = match self.state {
            SessionState::Unsubmitted => Some(self.prepare_read()?),
            SessionState::Incomplete => None,
            SessionState::Complete | SessionState::Finalized => {
                return Err(self.violation("submit a read"))
            }
        };

        let (status, cells) = self.execute_read()?;
        if let Some(columns) = expanded {
            self.columns = columns;
        }

        self.total_num_cells += cells;
        match status {
            QueryStatus::Complete => self.state = SessionState::Complete,
            other => {
                if other != QueryStatus::Incomplete {
                    warn!(status = %other, "unexpected read status");
                }
                self.results_complete = false;
                self.state = SessionState::Incomplete;
            }
        }
        debug!(cells, total = self.total_num_cells, status = %status, "read submitted");
        Ok(status)
    }

    /// Submits until the read is complete, calling `page` after each
    /// submission with the session and the page's cell count. Returns the
    /// total cell count.
    ///
    /// The first error, from a submission or from `page`, stops the loop.
    pub fn for_each_page<F, E>(&mut self, mut page: F) -> Result<usize, E>
    where
        F: FnMut(&ManagedQuery, usize) -> Result<(), E>,
        E: From<SessionError>,
    {
        loop {
            let before = self.total_num_cells;
            let status = self.submit()?;
            page(self, self.total_num_cells - before)?;
            if status == QueryStatus::Complete {
                return Ok(self.total_num_cells);
            }
        }
    }

    /// Runs one write submission of the attached buffers.
    ///
    /// Writes may be submitted repeatedly until `finalize`; they do not
    /// touch the read counters.
    pub fn submit_write(&mut self) -> SessionResult<QueryStatus> {
        let span = self.span.clone();
        let _enter = span.enter();

        if self.query.query_type() != QueryType::Write {
            return Err(self.violation("submit a write on a read session"));
        }
        if self.state == SessionState::Finalized {
            return Err(self.violation("submit a write"));
        }
        if self.state == SessionState::Unsubmitted
            && (!self.schema.is_sparse() || self.selector.is_set())
        {
            self.query.set_subarray(self.selector.subarray())?;
        }

        let sources: Vec<ColumnSource<'_>> = self
            .buffers
            .iter()
            .map(|(name, buffer)| buffer.source(name))
            .collect();
        let cells = sources.first().map(|s| s.num_cells).unwrap_or(0);
        let status = self.query.submit_write(&sources)?;

        self.state = SessionState::Complete;
        debug!(cells, status = %status, "write submitted");
        Ok(status)
    }

    /// Raw engine status of the last submission
    pub fn status(&self) -> QueryStatus {
        self.query.status()
    }

    /// True if the last submission completed
    pub fn is_complete(&self) -> bool {
        self.status() == QueryStatus::Complete
    }

    /// True if the last submission completed and no earlier one was
    /// incomplete, i.e. the buffers hold the whole result
    pub fn results_complete(&self) -> bool {
        self.is_complete() && self.results_complete
    }

    /// Cells read across all submissions
    pub fn total_num_cells(&self) -> usize {
        self.total_num_cells
    }

    /// Shared handle to the attached buffers.
    ///
    /// Release it before the next submission.
    pub fn results(&self) -> Arc<ColumnBuffers> {
        Arc::clone(&self.buffers)
    }

    /// Borrowed view of the attached buffers
    pub fn buffers(&self) -> &ColumnBuffers {
        &self.buffers
    }

    /// Typed view of column `name`
    pub fn data<T: CellType>(&self, name: &str) -> SessionResult<&[T]> {
        let buffer = self.column(name)?;
        buffer.data::<T>().map_err(|e| self.buffer_error(e))
    }

    /// All cells of string column `name`
    pub fn strings(&self, name: &str) -> SessionResult<Vec<String>> {
        let buffer = self.column(name)?;
        buffer.strings().map_err(|e| self.buffer_error(e))
    }

    /// Cell `index` of string column `name`
    pub fn string_view(&self, name: &str, index: usize) -> SessionResult<&str> {
        let buffer = self.column(name)?;
        buffer.string_view(index).map_err(|e| self.buffer_error(e))
    }

    /// Ends the query; pending global-order writes take effect
    pub fn finalize(&mut self) -> SessionResult<()> {
        if self.state == SessionState::Finalized {
            return Ok(());
        }
        self.query.finalize()?;
        self.state = SessionState::Finalized;
        debug!(parent: &self.span, total = self.total_num_cells, "session finalized");
        Ok(())
    }

    /// First-submission setup: subarray, default selection, buffer synthesis.
    ///
    /// Returns the columns to read; the selection itself is only replaced
    /// once the submission succeeds.
    fn prepare_read(&mut self) -> SessionResult<Vec<String>> {
        if !self.schema.is_sparse() || self.selector.is_set() {
            self.query.set_subarray(self.selector.subarray())?;
        }
        let columns = if self.columns.is_empty() {
            self.schema.column_names()
        } else {
            self.columns.clone()
        };

        let budget = self.config.init_buffer_bytes;
        for name in &columns {
            if self.buffers.contains(name) {
                continue;
            }
            let info = self
                .schema
                .column(name)
                .ok_or_else(|| EngineError::UnknownColumn(name.clone()))?;
            let buffer = ColumnBuffer::for_column(&info, budget);
            if self.set_column_data(name, Arc::new(buffer))? {
                debug!(column = %name, budget, "buffer synthesized");
            }
        }
        Ok(columns)
    }

    /// Lends every buffer to the engine and records the produced extents.
    /// Returns the status and the number of cells in this page.
    fn execute_read(&mut self) -> SessionResult<(QueryStatus, usize)> {
        let session = &self.name;
        let in_use = || SessionError::BuffersInUse {
            session: session.clone(),
        };

        let buffers = Arc::get_mut(&mut self.buffers).ok_or_else(in_use)?;
        let mut columns: Vec<(&str, &mut ColumnBuffer)> = Vec::with_capacity(buffers.len());
        for (name, buffer) in buffers.iter_mut() {
            columns.push((name, Arc::get_mut(buffer).ok_or_else(in_use)?));
        }

        let (status, extents) = {
            let mut targets: Vec<ColumnTarget<'_>> = columns
                .iter_mut()
                .map(|(name, buffer)| buffer.target(*name))
                .collect();
            let status = self.query.submit_read(&mut targets)?;
            let extents: Vec<(usize, usize)> =
                targets.iter().map(|t| (t.num_cells, t.data_len)).collect();
            (status, extents)
        };

        for ((_, buffer), (num_cells, data_len)) in columns.iter_mut().zip(&extents) {
            buffer
                .set_extent(*num_cells, *data_len)
                .map_err(|source| SessionError::Buffer {
                    session: session.clone(),
                    source,
                })?;
        }

        let cells = extents.first().map(|(n, _)| *n).unwrap_or(0);
        if extents.iter().any(|(n, _)| *n != cells) {
            warn!(cells, "buffers disagree on the page cell count");
        }
        Ok((status, cells))
    }

    fn column(&self, name: &str) -> SessionResult<&ColumnBuffer> {
        self.buffers
            .get(name)
            .ok_or_else(|| SessionError::ColumnNotFound {
                session: self.name.clone(),
                column: name.to_string(),
            })
    }

    fn buffer_error(&self, source: BufferError) -> SessionError {
        SessionError::Buffer {
            session: self.name.clone(),
            source,
        }
    }

    /// Fails if the caller still shares the collection or any buffer
    fn ensure_buffers_free(&self) -> SessionResult<()> {
        let shared = Arc::strong_count(&self.buffers) > 1
            || self
                .buffers
                .iter_shared()
                .any(|buffer| Arc::strong_count(buffer) > 1);
        if shared {
            return Err(SessionError::BuffersInUse {
                session: self.name.clone(),
            });
        }
        Ok(())
    }

    fn ensure_unsubmitted(&self, operation: &'static str) -> SessionResult<()> {
        if self.state.is_submitted() {
            return Err(self.violation(operation));
        }
        Ok(())
    }

    fn violation(&self, operation: &'static str) -> SessionError {
        SessionError::StateViolation {
            session: self.name.clone(),
            operation,
            state: self.state,
        }
    }
}

impl std::fmt::Debug for ManagedQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedQuery")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("uri", &self.array.uri())
            .field("state", &self.state)
            .field("columns", &self.columns)
            .field("total_num_cells", &self.total_num_cells)
            .finish()
    }
}
