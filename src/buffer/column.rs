//! Column buffer
//!
//! Memory for one column of query results or write input:
//! - data: cell values, 8-byte aligned so typed views need no copy
//! - offsets: start byte of each cell (variable-length columns only)
//! - validity: one byte per cell, zero meaning null (nullable columns only)
//!
//! A buffer has a fixed capacity and a current extent (`num_cells`,
//! `data_len`). Reads fill the extent from the start on every submission.

use std::mem;

use crate::engine::{ColumnInfo, ColumnSource, ColumnTarget, Datatype, Scalar};

use super::aligned::AlignedBytes;
use super::element::CellType;
use super::errors::{BufferError, BufferResult};

/// Memory backing one column
#[derive(Debug, Clone)]
pub struct ColumnBuffer {
    name: String,
    datatype: Datatype,
    data: AlignedBytes,
    data_len: usize,
    offsets: Option<Vec<u64>>,
    validity: Option<Vec<u8>>,
    num_cells: usize,
}

impl ColumnBuffer {
    /// Empty fixed-size buffer with room for `capacity_cells` cells
    pub fn fixed(name: impl Into<String>, datatype: Datatype, capacity_cells: usize) -> Self {
        Self {
            name: name.into(),
            datatype,
            data: AlignedBytes::zeroed(capacity_cells * datatype.size()),
            data_len: 0,
            offsets: None,
            validity: None,
            num_cells: 0,
        }
    }

    /// Empty variable-length buffer with room for `capacity_cells` cells
    /// totalling `capacity_bytes` bytes
    pub fn var(
        name: impl Into<String>,
        datatype: Datatype,
        capacity_cells: usize,
        capacity_bytes: usize,
    ) -> Self {
        Self {
            name: name.into(),
            datatype,
            data: AlignedBytes::zeroed(capacity_bytes),
            data_len: 0,
            offsets: Some(vec![0; capacity_cells]),
            validity: None,
            num_cells: 0,
        }
    }

    /// Adds a validity extent covering the capacity
    pub fn nullable(mut self) -> Self {
        self.validity = Some(vec![0; self.capacity_cells()]);
        self
    }

    /// Read buffer for a schema column, sized by a byte budget.
    ///
    /// Fixed columns get `budget / size` cells. Variable-length columns get
    /// `budget` data bytes and one offset per 8 bytes of budget.
    pub fn for_column(info: &ColumnInfo, budget_bytes: usize) -> Self {
        let buffer = if info.var {
            let cells = (budget_bytes / mem::size_of::<u64>()).max(1);
            Self::var(&info.name, info.datatype, cells, budget_bytes.max(1))
        } else {
            let cells = (budget_bytes / info.datatype.size()).max(1);
            Self::fixed(&info.name, info.datatype, cells)
        };
        if info.nullable {
            buffer.nullable()
        } else {
            buffer
        }
    }

    /// Fixed-size buffer holding `values`
    pub fn from_values<T: CellType>(
        name: impl Into<String>,
        datatype: Datatype,
        values: &[T],
    ) -> BufferResult<Self> {
        let mut buffer = Self::fixed(name, datatype, values.len());
        buffer.check_view::<T>()?;
        buffer.typed_capacity_mut::<T>().copy_from_slice(values);
        buffer.num_cells = values.len();
        buffer.data_len = values.len() * datatype.size();
        Ok(buffer)
    }

    /// Variable-length character buffer holding `values`
    pub fn from_strings<S: AsRef<str>>(
        name: impl Into<String>,
        datatype: Datatype,
        values: &[S],
    ) -> BufferResult<Self> {
        let name = name.into();
        if !datatype.is_string() {
            return Err(BufferError::InvalidColumnKind {
                column: name,
                expected: "string",
            });
        }
        if datatype == Datatype::StringAscii && !values.iter().all(|v| v.as_ref().is_ascii()) {
            return Err(BufferError::shape(name, "non-ASCII value in an ASCII column"));
        }

        let mut data = Vec::new();
        let mut offsets = Vec::with_capacity(values.len());
        for value in values {
            offsets.push(data.len() as u64);
            data.extend_from_slice(value.as_ref().as_bytes());
        }
        Ok(Self {
            name,
            datatype,
            data_len: data.len(),
            data: AlignedBytes::from_bytes(&data),
            offsets: Some(offsets),
            validity: None,
            num_cells: values.len(),
        })
    }

    /// Attaches a validity vector, one byte per current cell
    pub fn with_validity(mut self, validity: Vec<u8>) -> BufferResult<Self> {
        if validity.len() != self.num_cells {
            return Err(BufferError::shape(
                &self.name,
                format!(
                    "validity has {} entries for {} cells",
                    validity.len(),
                    self.num_cells
                ),
            ));
        }
        self.validity = Some(validity);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    pub fn is_var(&self) -> bool {
        self.offsets.is_some()
    }

    pub fn is_nullable(&self) -> bool {
        self.validity.is_some()
    }

    /// Cells in the current extent
    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    /// Bytes in the current data extent
    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// Cells that fit in the buffer
    pub fn capacity_cells(&self) -> usize {
        match &self.offsets {
            Some(offsets) => offsets.len(),
            None => self.data.len() / self.datatype.size(),
        }
    }

    /// Bytes that fit in the data extent
    pub fn capacity_bytes(&self) -> usize {
        self.data.len()
    }

    /// Zero-copy typed view over the current data extent
    pub fn data<T: CellType>(&self) -> BufferResult<&[T]> {
        self.check_view::<T>()?;
        let len = self.data_len / mem::size_of::<T>();
        // SAFETY: `check_view` guarantees T matches the stored element size,
        // CellType is only implemented for primitives valid for any bit
        // pattern with alignment <= 8, and the storage is 8-byte aligned with
        // at least `data_len` initialized bytes.
        Ok(unsafe { std::slice::from_raw_parts(self.data.as_ptr() as *const T, len) })
    }

    /// Raw bytes of the current data extent
    pub fn bytes(&self) -> &[u8] {
        &self.data.as_bytes()[..self.data_len]
    }

    /// Offsets of the current extent, if variable-length
    pub fn offsets(&self) -> Option<&[u64]> {
        self.offsets.as_deref().map(|o| &o[..self.num_cells])
    }

    /// Validity bytes of the current extent, if nullable
    pub fn validity(&self) -> Option<&[u8]> {
        self.validity.as_deref().map(|v| &v[..self.num_cells])
    }

    /// True if cell `index` is null
    pub fn is_null(&self, index: usize) -> BufferResult<bool> {
        self.check_index(index)?;
        Ok(self.validity().is_some_and(|v| v[index] == 0))
    }

    /// Bytes of one cell
    pub fn cell_bytes(&self, index: usize) -> BufferResult<&[u8]> {
        self.check_index(index)?;
        let bytes = self.bytes();
        match self.offsets() {
            Some(offsets) => {
                let start = offsets[index] as usize;
                let end = offsets
                    .get(index + 1)
                    .map(|o| *o as usize)
                    .unwrap_or(self.data_len);
                bytes
                    .get(start..end)
                    .ok_or_else(|| BufferError::shape(&self.name, "offsets exceed the data extent"))
            }
            None => {
                let size = self.datatype.size();
                Ok(&bytes[index * size..(index + 1) * size])
            }
        }
    }

    /// Every cell of a variable-length character column as an owned string.
    /// Null cells yield empty strings.
    pub fn strings(&self) -> BufferResult<Vec<String>> {
        self.check_strings()?;
        (0..self.num_cells)
            .map(|i| self.string_view(i).map(str::to_owned))
            .collect()
    }

    /// One cell of a variable-length character column, without copying
    pub fn string_view(&self, index: usize) -> BufferResult<&str> {
        self.check_strings()?;
        let bytes = self.cell_bytes(index)?;
        std::str::from_utf8(bytes).map_err(|_| BufferError::InvalidUtf8 {
            column: self.name.clone(),
            index,
        })
    }

    /// One cell decoded to a scalar; `None` for null cells
    pub fn scalar_at(&self, index: usize) -> BufferResult<Option<Scalar>> {
        if self.is_null(index)? {
            return Ok(None);
        }
        let bytes = self.cell_bytes(index)?;
        Scalar::decode(self.datatype, bytes)
            .map(Some)
            .ok_or_else(|| {
                BufferError::shape(&self.name, format!("cell {} has a bad width", index))
            })
    }

    /// Empties the extent, keeping the capacity
    pub fn clear(&mut self) {
        self.num_cells = 0;
        self.data_len = 0;
    }

    /// Read target over the whole capacity
    pub(crate) fn target<'a>(&'a mut self, name: &'a str) -> ColumnTarget<'a> {
        ColumnTarget {
            name,
            datatype: self.datatype,
            data: self.data.as_bytes_mut(),
            offsets: self.offsets.as_deref_mut(),
            validity: self.validity.as_deref_mut(),
            num_cells: 0,
            data_len: 0,
        }
    }

    /// Write source over the current extent
    pub(crate) fn source<'a>(&'a self, name: &'a str) -> ColumnSource<'a> {
        ColumnSource {
            name,
            datatype: self.datatype,
            data: self.bytes(),
            offsets: self.offsets(),
            validity: self.validity(),
            num_cells: self.num_cells,
        }
    }

    /// Records the extent produced by a read
    pub(crate) fn set_extent(&mut self, num_cells: usize, data_len: usize) -> BufferResult<()> {
        if num_cells > self.capacity_cells() || data_len > self.capacity_bytes() {
            return Err(BufferError::shape(
                &self.name,
                format!(
                    "extent of {} cells / {} bytes exceeds capacity",
                    num_cells, data_len
                ),
            ));
        }
        if !self.is_var() && data_len != num_cells * self.datatype.size() {
            return Err(BufferError::shape(
                &self.name,
                format!("{} bytes do not hold {} whole cells", data_len, num_cells),
            ));
        }
        self.num_cells = num_cells;
        self.data_len = data_len;
        Ok(())
    }

    fn check_view<T: CellType>(&self) -> BufferResult<()> {
        if T::accepts(self.datatype) && mem::size_of::<T>() == self.datatype.size() {
            Ok(())
        } else {
            Err(BufferError::TypeMismatch {
                column: self.name.clone(),
                requested: T::NAME,
                stored: self.datatype,
            })
        }
    }

    fn check_strings(&self) -> BufferResult<()> {
        let character = matches!(
            self.datatype,
            Datatype::Char | Datatype::StringAscii | Datatype::StringUtf8
        );
        if character && self.is_var() {
            Ok(())
        } else {
            Err(BufferError::InvalidColumnKind {
                column: self.name.clone(),
                expected: "variable-length string",
            })
        }
    }

    fn check_index(&self, index: usize) -> BufferResult<()> {
        if index < self.num_cells {
            Ok(())
        } else {
            Err(BufferError::OutOfRange {
                column: self.name.clone(),
                index,
                num_cells: self.num_cells,
            })
        }
    }

    /// Typed view over the full capacity; caller has run `check_view`
    fn typed_capacity_mut<T: CellType>(&mut self) -> &mut [T] {
        let len = self.data.len() / mem::size_of::<T>();
        let bytes = self.data.as_bytes_mut();
        // SAFETY: see `data`; the exclusive borrow of the storage covers the
        // returned slice.
        unsafe { std::slice::from_raw_parts_mut(bytes.as_mut_ptr() as *mut T, len) }
    }
}
