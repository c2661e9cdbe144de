//! Subarray: the per-dimension range selection of a query
//!
//! Ranges are additive. Several ranges on one dimension select their union;
//! ranges on different dimensions intersect. A dimension without ranges is
//! unconstrained.

use std::cmp::Ordering;
use std::sync::Arc;

use super::errors::{EngineError, EngineResult};
use super::scalar::Scalar;
use super::schema::ArraySchema;

/// Inclusive coordinate range
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub lo: Scalar,
    pub hi: Scalar,
}

impl Range {
    pub fn contains(&self, value: &Scalar) -> bool {
        matches!(
            self.lo.compare(value),
            Some(Ordering::Less | Ordering::Equal)
        ) && matches!(
            value.compare(&self.hi),
            Some(Ordering::Less | Ordering::Equal)
        )
    }

    pub fn is_point(&self) -> bool {
        self.lo == self.hi
    }
}

/// Range selection over the dimensions of one schema
#[derive(Debug, Clone)]
pub struct Subarray {
    schema: Arc<ArraySchema>,
    /// Indexed like `schema.dimensions`
    ranges: Vec<Vec<Range>>,
}

impl Subarray {
    pub fn new(schema: Arc<ArraySchema>) -> Self {
        let ranges = vec![Vec::new(); schema.dimensions.len()];
        Self { schema, ranges }
    }

    /// Adds an inclusive range on `dim`.
    ///
    /// Fails if the dimension is unknown, a bound does not fit the dimension
    /// type, `lo > hi`, or a bound lies outside the dimension domain.
    pub fn add_range(
        &mut self,
        dim: &str,
        lo: impl Into<Scalar>,
        hi: impl Into<Scalar>,
    ) -> EngineResult<()> {
        let index = self
            .schema
            .dimension_index(dim)
            .ok_or_else(|| EngineError::UnknownDimension(dim.to_string()))?;
        let dimension = &self.schema.dimensions[index];

        let coerce = |value: Scalar| {
            value.coerce(dimension.datatype).ok_or(EngineError::CoordinateType {
                dimension: dim.to_string(),
                expected: dimension.datatype,
                found: value.kind_name(),
            })
        };
        let lo = coerce(lo.into())?;
        let hi = coerce(hi.into())?;

        if lo.compare(&hi) == Some(Ordering::Greater) {
            return Err(EngineError::InvalidRange {
                dimension: dim.to_string(),
                lo: lo.to_string(),
                hi: hi.to_string(),
            });
        }

        if let Some((domain_lo, domain_hi)) = &dimension.domain {
            let domain = Range {
                lo: domain_lo.clone(),
                hi: domain_hi.clone(),
            };
            for bound in [&lo, &hi] {
                if !domain.contains(bound) {
                    return Err(EngineError::OutOfDomain {
                        dimension: dim.to_string(),
                        value: bound.to_string(),
                    });
                }
            }
        }

        self.ranges[index].push(Range { lo, hi });
        Ok(())
    }

    /// Ranges added on `dim`, in insertion order
    pub fn ranges(&self, dim: &str) -> &[Range] {
        match self.schema.dimension_index(dim) {
            Some(index) => &self.ranges[index],
            None => &[],
        }
    }

    pub fn range_num(&self, dim: &str) -> usize {
        self.ranges(dim).len()
    }

    /// True if no range was added on any dimension
    pub fn is_empty(&self) -> bool {
        self.ranges.iter().all(|r| r.is_empty())
    }

    pub fn schema(&self) -> &Arc<ArraySchema> {
        &self.schema
    }

    /// Tests a cell's coordinates (in schema dimension order)
    pub fn contains(&self, coords: &[Scalar]) -> bool {
        self.ranges.iter().zip(coords).all(|(ranges, coord)| {
            ranges.is_empty() || ranges.iter().any(|range| range.contains(coord))
        })
    }

    /// Single integer interval per dimension, used to address dense writes.
    ///
    /// Dimensions without ranges span their whole domain.
    pub fn dense_box(&self) -> EngineResult<Vec<(i64, i64)>> {
        let mut bounds = Vec::with_capacity(self.ranges.len());
        for (dim, ranges) in self.schema.dimensions.iter().zip(&self.ranges) {
            let range = match ranges.as_slice() {
                [] => match &dim.domain {
                    Some((lo, hi)) => Range {
                        lo: lo.clone(),
                        hi: hi.clone(),
                    },
                    None => {
                        return Err(EngineError::InvalidWrite(format!(
                            "dimension '{}' has neither a range nor a domain",
                            dim.name
                        )))
                    }
                },
                [single] => single.clone(),
                _ => {
                    return Err(EngineError::InvalidWrite(format!(
                        "dense writes need a single range on dimension '{}'",
                        dim.name
                    )))
                }
            };
            match (range.lo.coerce(dim.datatype), range.hi.coerce(dim.datatype)) {
                (Some(Scalar::Int(lo)), Some(Scalar::Int(hi))) => bounds.push((lo, hi)),
                (Some(Scalar::UInt(lo)), Some(Scalar::UInt(hi))) => {
                    let to_i64 = |v: u64| {
                        i64::try_from(v).map_err(|_| EngineError::OutOfDomain {
                            dimension: dim.name.clone(),
                            value: v.to_string(),
                        })
                    };
                    bounds.push((to_i64(lo)?, to_i64(hi)?));
                }
                _ => {
                    return Err(EngineError::InvalidWrite(format!(
                        "dimension '{}' is not integral",
                        dim.name
                    )))
                }
            }
        }
        Ok(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::schema::Dimension;
    use crate::engine::types::Datatype;

    fn schema() -> Arc<ArraySchema> {
        Arc::new(
            ArraySchema::sparse()
                .with_dimension(Dimension::new("contig", Datatype::StringAscii))
                .with_dimension(Dimension::new("pos", Datatype::Int32).with_domain(0, 1000)),
        )
    }

    #[test]
    fn test_ranges_accumulate() {
        let mut subarray = Subarray::new(schema());
        subarray.add_range("pos", 10, 20).unwrap();
        subarray.add_range("pos", 30, 40).unwrap();
        assert_eq!(subarray.range_num("pos"), 2);

        let cell = |pos: i64| vec![Scalar::from("chr1"), Scalar::Int(pos)];
        assert!(subarray.contains(&cell(15)));
        assert!(subarray.contains(&cell(30)));
        assert!(!subarray.contains(&cell(25)));
        assert!(!subarray.contains(&cell(41)));
    }

    #[test]
    fn test_dimensions_intersect() {
        let mut subarray = Subarray::new(schema());
        subarray.add_range("contig", "chr2", "chr2").unwrap();
        subarray.add_range("pos", 0, 100).unwrap();
        assert!(subarray.contains(&[Scalar::from("chr2"), Scalar::Int(5)]));
        assert!(!subarray.contains(&[Scalar::from("chr1"), Scalar::Int(5)]));
    }

    #[test]
    fn test_unknown_dimension() {
        let mut subarray = Subarray::new(schema());
        let err = subarray.add_range("chrom", 1, 2).unwrap_err();
        assert_eq!(err, EngineError::UnknownDimension("chrom".into()));
        assert!(subarray.is_empty());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut subarray = Subarray::new(schema());
        assert!(matches!(
            subarray.add_range("pos", 20, 10),
            Err(EngineError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_out_of_domain_rejected() {
        let mut subarray = Subarray::new(schema());
        assert!(matches!(
            subarray.add_range("pos", 900, 1001),
            Err(EngineError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn test_coordinate_kind_checked() {
        let mut subarray = Subarray::new(schema());
        assert!(matches!(
            subarray.add_range("pos", "a", "b"),
            Err(EngineError::CoordinateType { .. })
        ));
    }

    #[test]
    fn test_dense_box_defaults_to_domain() {
        let schema = Arc::new(
            ArraySchema::dense()
                .with_dimension(Dimension::new("row", Datatype::Int64).with_domain(0, 9))
                .with_dimension(Dimension::new("col", Datatype::UInt8).with_domain(0u8, 3u8)),
        );
        let mut subarray = Subarray::new(schema);
        subarray.add_range("row", 2, 4).unwrap();
        assert_eq!(subarray.dense_box().unwrap(), vec![(2, 4), (0, 3)]);
    }
}
