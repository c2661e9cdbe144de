//! Buffer hand-off between a managed query and an engine
//!
//! Binding happens in two steps. Before submission, the query is told which
//! columns are bound and which extents (data, offsets, validity) each one
//! carries. At submission, the caller lends the memory itself: mutable
//! slices for reads, immutable extents for writes. No data is copied on the
//! caller's side.

use super::types::Datatype;

/// Which extents are bound for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBinding {
    pub datatype: Datatype,
    pub offsets: bool,
    pub validity: bool,
}

impl BufferBinding {
    pub fn data(datatype: Datatype) -> Self {
        Self {
            datatype,
            offsets: false,
            validity: false,
        }
    }
}

/// Read target for one column
///
/// The engine writes results from the start of each slice and reports the
/// produced extent in `num_cells` and `data_len`.
#[derive(Debug)]
pub struct ColumnTarget<'a> {
    pub name: &'a str,
    pub datatype: Datatype,
    pub data: &'a mut [u8],
    /// Byte offset of each cell's first byte, one entry per cell
    pub offsets: Option<&'a mut [u64]>,
    /// One byte per cell, zero meaning null
    pub validity: Option<&'a mut [u8]>,
    pub num_cells: usize,
    pub data_len: usize,
}

impl ColumnTarget<'_> {
    /// Cells that fit in the offsets or data extent
    pub fn capacity_cells(&self) -> usize {
        let cells = match &self.offsets {
            Some(offsets) => offsets.len(),
            None => self.data.len() / self.datatype.size(),
        };
        match &self.validity {
            Some(validity) => cells.min(validity.len()),
            None => cells,
        }
    }
}

/// Write source for one column: exactly the cells to write
#[derive(Debug, Clone, Copy)]
pub struct ColumnSource<'a> {
    pub name: &'a str,
    pub datatype: Datatype,
    pub data: &'a [u8],
    pub offsets: Option<&'a [u64]>,
    pub validity: Option<&'a [u8]>,
    pub num_cells: usize,
}

impl<'a> ColumnSource<'a> {
    /// Bytes of cell `index`; None if the extents are inconsistent
    pub fn cell(&self, index: usize) -> Option<&'a [u8]> {
        match self.offsets {
            Some(offsets) => {
                let start = usize::try_from(*offsets.get(index)?).ok()?;
                let end = match offsets.get(index + 1) {
                    Some(next) => usize::try_from(*next).ok()?,
                    None => self.data.len(),
                };
                self.data.get(start..end)
            }
            None => {
                let size = self.datatype.size();
                self.data.get(index * size..(index + 1) * size)
            }
        }
    }

    /// False if the validity extent marks cell `index` as null
    pub fn is_valid(&self, index: usize) -> bool {
        match self.validity {
            Some(validity) => validity.get(index).is_some_and(|v| *v != 0),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_var_cells() {
        let data = b"abcde";
        let offsets = [0u64, 2, 2];
        let source = ColumnSource {
            name: "s",
            datatype: Datatype::StringAscii,
            data,
            offsets: Some(&offsets),
            validity: None,
            num_cells: 3,
        };
        assert_eq!(source.cell(0), Some(&b"ab"[..]));
        assert_eq!(source.cell(1), Some(&b""[..]));
        assert_eq!(source.cell(2), Some(&b"cde"[..]));
        assert_eq!(source.cell(3), None);
    }

    #[test]
    fn test_source_fixed_cells_and_validity() {
        let data = [1u8, 0, 2, 0];
        let validity = [1u8, 0];
        let source = ColumnSource {
            name: "v",
            datatype: Datatype::UInt16,
            data: &data,
            offsets: None,
            validity: Some(&validity),
            num_cells: 2,
        };
        assert_eq!(source.cell(1), Some(&[2u8, 0][..]));
        assert!(source.is_valid(0));
        assert!(!source.is_valid(1));
    }

    #[test]
    fn test_target_capacity() {
        let mut data = [0u8; 16];
        let mut validity = [0u8; 3];
        let target = ColumnTarget {
            name: "x",
            datatype: Datatype::Int32,
            data: &mut data,
            offsets: None,
            validity: Some(&mut validity),
            num_cells: 0,
            data_len: 0,
        };
        assert_eq!(target.capacity_cells(), 3);
    }
}
