//! Queries of the in-memory engine
//!
//! Reads fix their result set at the first submission and then hand it out
//! page by page: each submission fills the bound buffers with as many whole
//! cells as fit and reports `Incomplete` while cells remain. Writes decode
//! the caller's buffers into cells; global-order writes become visible only
//! at `finalize`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::engine::binding::{BufferBinding, ColumnSource, ColumnTarget};
use crate::engine::capability::Query;
use crate::engine::condition::QueryCondition;
use crate::engine::errors::{EngineError, EngineResult};
use crate::engine::scalar::Scalar;
use crate::engine::schema::{ArraySchema, ColumnInfo};
use crate::engine::subarray::Subarray;
use crate::engine::types::{ArrayType, Datatype, Layout, QueryStatus, QueryType};

use super::store::{ArrayStore, CellRecord};

/// Position of a column inside a [`CellRecord`]
#[derive(Debug, Clone, Copy)]
enum Slot {
    Coord(usize),
    Value(usize),
}

impl Slot {
    fn resolve(schema: &ArraySchema, name: &str) -> EngineResult<Slot> {
        if let Some(index) = schema.dimension_index(name) {
            return Ok(Slot::Coord(index));
        }
        schema
            .attribute_index(name)
            .map(Slot::Value)
            .ok_or_else(|| EngineError::UnknownColumn(name.to_string()))
    }

    fn get<'a>(&self, cell: &'a CellRecord) -> Option<&'a Scalar> {
        match self {
            Slot::Coord(i) => cell.coords.get(*i),
            Slot::Value(i) => cell.values.get(*i).and_then(|v| v.as_ref()),
        }
    }
}

/// Query over an [`ArrayStore`]
pub struct MemQuery {
    store: Arc<ArrayStore>,
    query_type: QueryType,
    layout: Layout,
    condition: Option<QueryCondition>,
    subarray: Option<Subarray>,
    bindings: BTreeMap<String, BufferBinding>,
    status: QueryStatus,
    /// Read result set, fixed at the first submission
    results: Option<Vec<CellRecord>>,
    cursor: usize,
    /// Global-order writes awaiting finalize
    pending: Vec<CellRecord>,
    finalized: bool,
}

impl MemQuery {
    pub(crate) fn new(store: Arc<ArrayStore>, query_type: QueryType) -> Self {
        let layout = match store.schema().array_type() {
            ArrayType::Sparse => Layout::Unordered,
            ArrayType::Dense => Layout::RowMajor,
        };
        Self {
            store,
            query_type,
            layout,
            condition: None,
            subarray: None,
            bindings: BTreeMap::new(),
            status: QueryStatus::Uninitialized,
            results: None,
            cursor: 0,
            pending: Vec::new(),
            finalized: false,
        }
    }

    fn schema(&self) -> &ArraySchema {
        self.store.schema()
    }

    fn column(&self, name: &str) -> EngineResult<ColumnInfo> {
        self.schema()
            .column(name)
            .ok_or_else(|| EngineError::UnknownColumn(name.to_string()))
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.finalized {
            return Err(EngineError::InvalidState("query is finalized".into()));
        }
        Ok(())
    }

    fn ensure_unsubmitted(&self, what: &str) -> EngineResult<()> {
        if self.status != QueryStatus::Uninitialized {
            return Err(EngineError::InvalidState(format!(
                "cannot set {} after submission",
                what
            )));
        }
        Ok(())
    }

    /// Checks a bound column against the buffers offered for it
    fn check_binding(
        &self,
        name: &str,
        datatype: Datatype,
        has_offsets: bool,
        has_validity: bool,
    ) -> EngineResult<()> {
        let binding = self
            .bindings
            .get(name)
            .ok_or_else(|| EngineError::binding(name, "column has no bound buffer"))?;
        let info = self.column(name)?;
        if binding.datatype != datatype {
            return Err(EngineError::binding(
                name,
                format!(
                    "buffer datatype {} differs from binding {}",
                    datatype, binding.datatype
                ),
            ));
        }
        if info.var && !binding.offsets {
            return Err(EngineError::binding(
                name,
                "variable-length column needs an offsets buffer",
            ));
        }
        if info.nullable && !binding.validity {
            return Err(EngineError::binding(name, "nullable column needs a validity buffer"));
        }
        if binding.offsets != has_offsets || binding.validity != has_validity {
            return Err(EngineError::binding(name, "buffer extents differ from the binding"));
        }
        Ok(())
    }

    fn check_all_bound<'a, I>(&self, names: I) -> EngineResult<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let offered: Vec<&str> = names.into_iter().collect();
        if offered.is_empty() {
            return Err(EngineError::InvalidState("no buffers bound".into()));
        }
        for bound in self.bindings.keys() {
            if !offered.contains(&bound.as_str()) {
                return Err(EngineError::binding(bound.as_str(), "bound buffer was not supplied"));
            }
        }
        Ok(())
    }

    /// Cells matching subarray and condition, in layout order
    fn collect_results(&self) -> EngineResult<Vec<CellRecord>> {
        let schema = self.schema();
        let mut cells: Vec<CellRecord> = self
            .store
            .snapshot()?
            .into_iter()
            .filter(|cell| {
                self.subarray
                    .as_ref()
                    .map_or(true, |subarray| subarray.contains(&cell.coords))
            })
            .filter(|cell| {
                self.condition.as_ref().map_or(true, |condition| {
                    let lookup = |name: &str| {
                        schema
                            .attribute_index(name)
                            .and_then(|i| cell.values[i].as_ref())
                    };
                    condition.evaluate(&lookup)
                })
            })
            .collect();
        sort_cells(&mut cells, self.layout);
        Ok(cells)
    }

    /// Decodes write sources into cells
    fn decode_sources(&self, sources: &[ColumnSource<'_>]) -> EngineResult<Vec<CellRecord>> {
        let schema = self.schema();
        let num_cells = sources.first().map(|s| s.num_cells).unwrap_or(0);
        if let Some(odd) = sources.iter().find(|s| s.num_cells != num_cells) {
            return Err(EngineError::InvalidWrite(format!(
                "buffer '{}' holds {} cells, expected {}",
                odd.name, odd.num_cells, num_cells
            )));
        }

        let by_name: BTreeMap<&str, &ColumnSource<'_>> =
            sources.iter().map(|s| (s.name, s)).collect();
        for attr in &schema.attributes {
            if !by_name.contains_key(attr.name.as_str()) {
                return Err(EngineError::InvalidWrite(format!(
                    "missing buffer for attribute '{}'",
                    attr.name
                )));
            }
        }

        let decode = |source: &ColumnSource<'_>, index: usize| -> EngineResult<Option<Scalar>> {
            if !source.is_valid(index) {
                return Ok(None);
            }
            let bytes = source.cell(index).ok_or_else(|| {
                EngineError::InvalidWrite(format!(
                    "buffer '{}' ends before cell {}",
                    source.name, index
                ))
            })?;
            Scalar::decode(source.datatype, bytes).map(Some).ok_or_else(|| {
                EngineError::InvalidWrite(format!(
                    "cell {} of '{}' is not a valid {}",
                    index, source.name, source.datatype
                ))
            })
        };

        let coords: Vec<Vec<Scalar>> = match schema.array_type() {
            ArrayType::Sparse => {
                let mut coords = vec![Vec::with_capacity(schema.dimensions.len()); num_cells];
                for dim in &schema.dimensions {
                    let source = by_name.get(dim.name.as_str()).ok_or_else(|| {
                        EngineError::InvalidWrite(format!(
                            "missing buffer for dimension '{}'",
                            dim.name
                        ))
                    })?;
                    for (index, cell) in coords.iter_mut().enumerate() {
                        let value = decode(*source, index)?.ok_or_else(|| {
                            EngineError::InvalidWrite(format!(
                                "dimension '{}' cannot be null",
                                dim.name
                            ))
                        })?;
                        cell.push(value);
                    }
                }
                coords
            }
            ArrayType::Dense => {
                let subarray = self
                    .subarray
                    .clone()
                    .unwrap_or_else(|| Subarray::new(Arc::clone(self.store.schema())));
                let bounds = subarray.dense_box()?;
                match dense_cell_count(&bounds) {
                    Some(count) if count == num_cells => dense_coords(&bounds, self.layout),
                    Some(count) => {
                        return Err(EngineError::InvalidWrite(format!(
                            "subarray addresses {} cells but buffers hold {}",
                            count, num_cells
                        )))
                    }
                    None => {
                        return Err(EngineError::InvalidWrite(format!(
                            "subarray cell count overflows, buffers hold {}",
                            num_cells
                        )))
                    }
                }
            }
        };

        let mut records = Vec::with_capacity(num_cells);
        for (index, coords) in coords.into_iter().enumerate() {
            let values = schema
                .attributes
                .iter()
                .map(|attr| match by_name.get(attr.name.as_str()) {
                    Some(source) => decode(*source, index),
                    None => Ok(None),
                })
                .collect::<EngineResult<Vec<_>>>()?;
            records.push(CellRecord { coords, values });
        }
        Ok(records)
    }
}

impl Query for MemQuery {
    fn query_type(&self) -> QueryType {
        self.query_type
    }

    fn set_layout(&mut self, layout: Layout) -> EngineResult<()> {
        self.ensure_open()?;
        self.ensure_unsubmitted("layout")?;
        if self.schema().array_type() == ArrayType::Dense && layout == Layout::Unordered {
            return Err(EngineError::InvalidState(
                "dense arrays do not support the unordered layout".into(),
            ));
        }
        self.layout = layout;
        Ok(())
    }

    fn layout(&self) -> Layout {
        self.layout
    }

    fn set_condition(&mut self, condition: &QueryCondition) -> EngineResult<()> {
        self.ensure_unsubmitted("condition")?;
        if self.query_type != QueryType::Read {
            return Err(EngineError::Condition(
                "conditions apply to read queries only".into(),
            ));
        }
        condition.check(self.schema())?;
        self.condition = Some(condition.clone());
        Ok(())
    }

    fn set_subarray(&mut self, subarray: &Subarray) -> EngineResult<()> {
        self.ensure_open()?;
        if subarray.schema().as_ref() != self.schema() {
            return Err(EngineError::InvalidState(
                "subarray belongs to a different schema".into(),
            ));
        }
        self.subarray = Some(subarray.clone());
        Ok(())
    }

    fn set_data_buffer(&mut self, column: &str, datatype: Datatype) -> EngineResult<()> {
        let info = self.column(column)?;
        if info.datatype != datatype {
            return Err(EngineError::binding(
                column,
                format!(
                    "buffer datatype {} differs from column type {}",
                    datatype, info.datatype
                ),
            ));
        }
        if self.query_type == QueryType::Write
            && info.is_dimension
            && self.schema().array_type() == ArrayType::Dense
        {
            return Err(EngineError::binding(
                column,
                "dense writes address coordinates through the subarray",
            ));
        }
        // Rebinding the data extent drops the column's other extents.
        self.bindings
            .insert(column.to_string(), BufferBinding::data(datatype));
        Ok(())
    }

    fn set_offsets_buffer(&mut self, column: &str) -> EngineResult<()> {
        let info = self.column(column)?;
        if !info.var {
            return Err(EngineError::binding(column, "column is not variable-length"));
        }
        self.bindings
            .entry(column.to_string())
            .or_insert_with(|| BufferBinding::data(info.datatype))
            .offsets = true;
        Ok(())
    }

    fn set_validity_buffer(&mut self, column: &str) -> EngineResult<()> {
        let info = self.column(column)?;
        if !info.nullable {
            return Err(EngineError::binding(column, "column is not nullable"));
        }
        self.bindings
            .entry(column.to_string())
            .or_insert_with(|| BufferBinding::data(info.datatype))
            .validity = true;
        Ok(())
    }

    fn submit_read(&mut self, targets: &mut [ColumnTarget<'_>]) -> EngineResult<QueryStatus> {
        if self.query_type != QueryType::Read {
            return Err(EngineError::InvalidState("read submitted on a write query".into()));
        }
        self.ensure_open()?;
        self.check_all_bound(targets.iter().map(|t| t.name))?;
        for target in targets.iter() {
            self.check_binding(
                target.name,
                target.datatype,
                target.offsets.is_some(),
                target.validity.is_some(),
            )?;
        }

        let schema = Arc::clone(self.store.schema());
        let slots = targets
            .iter()
            .map(|t| Slot::resolve(&schema, t.name))
            .collect::<EngineResult<Vec<_>>>()?;

        // A finished query starts over on resubmission.
        if self.status == QueryStatus::Complete {
            self.results = None;
        }
        if self.results.is_none() {
            let results = self.collect_results()?;
            debug!(
                uri = %self.store.uri(),
                matched = results.len(),
                layout = %self.layout,
                "read result set fixed"
            );
            self.results = Some(results);
            self.cursor = 0;
        }
        let results = self.results.as_deref().unwrap_or(&[]);
        let start = self.cursor;

        for target in targets.iter_mut() {
            target.num_cells = 0;
            target.data_len = 0;
        }

        let mut encoded: Vec<Vec<u8>> = vec![Vec::new(); targets.len()];
        let mut blocked_by = None;
        let mut written = 0;
        for cell in &results[start..] {
            for ((target, slot), bytes) in targets.iter().zip(&slots).zip(encoded.iter_mut()) {
                bytes.clear();
                match slot.get(cell) {
                    Some(value) => value.encode(target.datatype, bytes),
                    None if target.offsets.is_none() => bytes.resize(target.datatype.size(), 0),
                    None => {}
                }
            }

            blocked_by = targets
                .iter()
                .zip(&encoded)
                .find(|(target, bytes)| !fits(target, bytes.len()))
                .map(|(target, _)| target.name.to_string());
            if blocked_by.is_some() {
                break;
            }

            for ((target, slot), bytes) in targets.iter_mut().zip(&slots).zip(&encoded) {
                let at = target.num_cells;
                let offset = target.data_len;
                target.data[offset..offset + bytes.len()].copy_from_slice(bytes);
                if let Some(offsets) = target.offsets.as_deref_mut() {
                    offsets[at] = offset as u64;
                }
                if let Some(validity) = target.validity.as_deref_mut() {
                    validity[at] = u8::from(slot.get(cell).is_some());
                }
                target.num_cells += 1;
                target.data_len += bytes.len();
            }
            written += 1;
        }

        let remaining = results.len() - start - written;
        if written == 0 && remaining > 0 {
            self.status = QueryStatus::Failed;
            return Err(EngineError::BufferTooSmall {
                column: blocked_by.unwrap_or_default(),
            });
        }

        self.cursor = start + written;
        self.status = if remaining > 0 {
            QueryStatus::Incomplete
        } else {
            QueryStatus::Complete
        };
        trace!(cells = written, remaining, status = %self.status, "read page");
        Ok(self.status)
    }

    fn submit_write(&mut self, sources: &[ColumnSource<'_>]) -> EngineResult<QueryStatus> {
        if self.query_type != QueryType::Write {
            return Err(EngineError::InvalidState("write submitted on a read query".into()));
        }
        self.ensure_open()?;
        self.check_all_bound(sources.iter().map(|s| s.name))?;
        for source in sources {
            self.check_binding(
                source.name,
                source.datatype,
                source.offsets.is_some(),
                source.validity.is_some(),
            )?;
        }

        let records = self.decode_sources(sources)?;
        let count = records.len();
        if self.layout == Layout::GlobalOrder {
            let sequence: Vec<&CellRecord> =
                self.pending.last().into_iter().chain(&records).collect();
            let ordered = sequence.windows(2).all(|pair| {
                compare_coords(&pair[0].coords, &pair[1].coords, Layout::RowMajor)
                    != Ordering::Greater
            });
            if !ordered {
                self.status = QueryStatus::Failed;
                return Err(EngineError::InvalidWrite(
                    "cells are not in global order".into(),
                ));
            }
            self.pending.extend(records);
        } else {
            self.store.append(records)?;
        }
        self.status = QueryStatus::Complete;
        debug!(uri = %self.store.uri(), cells = count, layout = %self.layout, "write submitted");
        Ok(self.status)
    }

    fn status(&self) -> QueryStatus {
        self.status
    }

    fn finalize(&mut self) -> EngineResult<()> {
        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            self.store.append(pending)?;
        }
        self.finalized = true;
        Ok(())
    }
}

/// Whether `len` more bytes (one more cell) fit in `target`
fn fits(target: &ColumnTarget<'_>, len: usize) -> bool {
    let cell_fits = match &target.offsets {
        Some(offsets) => target.num_cells < offsets.len(),
        None => true,
    };
    let validity_fits = match &target.validity {
        Some(validity) => target.num_cells < validity.len(),
        None => true,
    };
    cell_fits && validity_fits && target.data_len + len <= target.data.len()
}

fn compare_coords(a: &[Scalar], b: &[Scalar], layout: Layout) -> Ordering {
    let pairs: Box<dyn Iterator<Item = (&Scalar, &Scalar)>> = match layout {
        Layout::ColMajor => Box::new(a.iter().zip(b).rev()),
        _ => Box::new(a.iter().zip(b)),
    };
    for (x, y) in pairs {
        match x.compare(y) {
            Some(Ordering::Equal) | None => continue,
            Some(ordering) => return ordering,
        }
    }
    Ordering::Equal
}

fn sort_cells(cells: &mut [CellRecord], layout: Layout) {
    if layout != Layout::Unordered {
        cells.sort_by(|a, b| compare_coords(&a.coords, &b.coords, layout));
    }
}

/// Number of cells in a dense box; `None` when it overflows `usize`
fn dense_cell_count(bounds: &[(i64, i64)]) -> Option<usize> {
    bounds.iter().try_fold(1usize, |count, &(lo, hi)| {
        if hi < lo {
            return Some(0);
        }
        let extent = hi.checked_sub(lo)?.checked_add(1)?;
        count.checked_mul(usize::try_from(extent).ok()?)
    })
}

/// Coordinates of every cell in a dense box, in layout order.
///
/// Callers bound the box with [`dense_cell_count`] first.
fn dense_coords(bounds: &[(i64, i64)], layout: Layout) -> Vec<Vec<Scalar>> {
    let mut cells: Vec<Vec<Scalar>> = vec![Vec::new()];
    for &(lo, hi) in bounds {
        let extent = if hi < lo { 0 } else { (hi - lo) as usize + 1 };
        let mut next = Vec::with_capacity(cells.len() * extent);
        for prefix in &cells {
            for value in lo..=hi {
                let mut cell = prefix.clone();
                cell.push(Scalar::Int(value));
                next.push(cell);
            }
        }
        cells = next;
    }
    sort_cells_by_coords(&mut cells, layout);
    cells
}

fn sort_cells_by_coords(cells: &mut [Vec<Scalar>], layout: Layout) {
    if layout == Layout::ColMajor {
        cells.sort_by(|a, b| compare_coords(a, b, Layout::ColMajor));
    }
}
