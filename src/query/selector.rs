//! Range selector
//!
//! Accumulates per-dimension ranges into an engine [`Subarray`]. Ranges on
//! one dimension form a union; ranges on different dimensions intersect.

use std::sync::Arc;

use crate::engine::{ArraySchema, EngineResult, Scalar, Subarray};

#[derive(Debug, Clone)]
pub struct RangeSelector {
    subarray: Subarray,
    range_set: bool,
}

impl RangeSelector {
    pub fn new(schema: Arc<ArraySchema>) -> Self {
        Self {
            subarray: Subarray::new(schema),
            range_set: false,
        }
    }

    /// Adds the inclusive range `[lo, hi]` on `dim`
    pub fn add_range(
        &mut self,
        dim: &str,
        lo: impl Into<Scalar>,
        hi: impl Into<Scalar>,
    ) -> EngineResult<()> {
        self.subarray.add_range(dim, lo, hi)?;
        self.range_set = true;
        Ok(())
    }

    /// Adds the single coordinate `value` on `dim`
    pub fn add_point(&mut self, dim: &str, value: impl Into<Scalar>) -> EngineResult<()> {
        let value = value.into();
        self.add_range(dim, value.clone(), value)
    }

    pub fn add_ranges<T, I>(&mut self, dim: &str, ranges: I) -> EngineResult<()>
    where
        T: Into<Scalar>,
        I: IntoIterator<Item = (T, T)>,
    {
        for (lo, hi) in ranges {
            self.add_range(dim, lo, hi)?;
        }
        Ok(())
    }

    pub fn add_points<T, I>(&mut self, dim: &str, points: I) -> EngineResult<()>
    where
        T: Into<Scalar>,
        I: IntoIterator<Item = T>,
    {
        for point in points {
            self.add_point(dim, point)?;
        }
        Ok(())
    }

    /// True once any range was added; never reset
    pub fn is_set(&self) -> bool {
        self.range_set
    }

    pub fn subarray(&self) -> &Subarray {
        &self.subarray
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Datatype, Dimension, EngineError};

    fn schema() -> Arc<ArraySchema> {
        Arc::new(
            ArraySchema::sparse()
                .with_dimension(Dimension::new("pos", Datatype::UInt32).with_domain(0u32, 1000u32))
                .with_dimension(Dimension::new("sample", Datatype::StringAscii)),
        )
    }

    #[test]
    fn test_ranges_accumulate() {
        let mut selector = RangeSelector::new(schema());
        assert!(!selector.is_set());
        selector.add_ranges("pos", [(10u32, 20u32), (30, 40)]).unwrap();
        assert!(selector.is_set());
        assert_eq!(selector.subarray().range_num("pos"), 2);
        assert!(selector.subarray().contains(&[Scalar::UInt(15), Scalar::from("a")]));
        assert!(selector.subarray().contains(&[Scalar::UInt(35), Scalar::from("a")]));
        assert!(!selector.subarray().contains(&[Scalar::UInt(25), Scalar::from("a")]));
    }

    #[test]
    fn test_points_on_string_dimension() {
        let mut selector = RangeSelector::new(schema());
        selector.add_points("sample", ["HG001", "HG003"]).unwrap();
        let ranges = selector.subarray().ranges("sample");
        assert_eq!(ranges.len(), 2);
        assert!(ranges.iter().all(|r| r.is_point()));
    }

    #[test]
    fn test_bad_range_leaves_flag_unset() {
        let mut selector = RangeSelector::new(schema());
        let err = selector.add_range("pos", 20u32, 10u32).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRange { .. }));
        assert!(!selector.is_set());
        assert!(selector.add_point("nope", 1).is_err());
    }
}
