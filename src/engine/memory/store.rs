//! Cell store and array handles of the in-memory engine

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::engine::capability::{Array, Query};
use crate::engine::errors::{EngineError, EngineResult};
use crate::engine::scalar::Scalar;
use crate::engine::schema::ArraySchema;
use crate::engine::subarray::Range;
use crate::engine::types::{ArrayType, QueryType};

use super::query::MemQuery;

/// One stored cell: coordinates in dimension order, values in attribute
/// order, nulls as `None`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CellRecord {
    pub coords: Vec<Scalar>,
    pub values: Vec<Option<Scalar>>,
}

/// Shared cell storage of one array
///
/// Cells are appended by write queries (or snapshot loading) and read by
/// read queries. The store is guarded by an `RwLock`, so handles opened from
/// one store may be used from several threads.
#[derive(Debug)]
pub struct ArrayStore {
    uri: String,
    schema: Arc<ArraySchema>,
    cells: RwLock<Vec<CellRecord>>,
}

impl ArrayStore {
    /// Creates an empty array after validating its schema
    pub fn create(uri: impl Into<String>, schema: ArraySchema) -> EngineResult<Arc<Self>> {
        schema.validate()?;
        Ok(Arc::new(Self {
            uri: uri.into(),
            schema: Arc::new(schema),
            cells: RwLock::new(Vec::new()),
        }))
    }

    /// Opens a handle in `mode`
    pub fn open(self: &Arc<Self>, mode: QueryType) -> Arc<MemArray> {
        Arc::new(MemArray {
            store: Arc::clone(self),
            mode,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn schema(&self) -> &Arc<ArraySchema> {
        &self.schema
    }

    /// Number of stored cells
    pub fn cell_count(&self) -> EngineResult<usize> {
        Ok(self.read_cells()?.len())
    }

    /// Inserts rows keyed by column name. Missing or null attributes are
    /// stored as null; every dimension must be present.
    pub fn insert_rows<I>(&self, rows: I) -> EngineResult<()>
    where
        I: IntoIterator<Item = BTreeMap<String, Option<Scalar>>>,
    {
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| self.record_from_row(i, row))
            .collect::<EngineResult<Vec<_>>>()?;
        self.append(records)
    }

    fn record_from_row(
        &self,
        index: usize,
        mut row: BTreeMap<String, Option<Scalar>>,
    ) -> EngineResult<CellRecord> {
        let mut coords = Vec::with_capacity(self.schema.dimensions.len());
        for dim in &self.schema.dimensions {
            match row.remove(&dim.name) {
                Some(Some(value)) => coords.push(value),
                _ => {
                    return Err(EngineError::Snapshot(format!(
                        "row {} has no value for dimension '{}'",
                        index, dim.name
                    )))
                }
            }
        }
        let values = self
            .schema
            .attributes
            .iter()
            .map(|attr| row.remove(&attr.name).flatten())
            .collect();
        if let Some(unknown) = row.keys().next() {
            return Err(EngineError::Snapshot(format!(
                "row {} has unknown column '{}'",
                index, unknown
            )));
        }
        Ok(CellRecord { coords, values })
    }

    /// Validates and stores cells. Dense cells replace any stored cell with
    /// the same coordinates.
    pub(crate) fn append(&self, records: Vec<CellRecord>) -> EngineResult<()> {
        let records = records
            .into_iter()
            .map(|record| self.normalize(record))
            .collect::<EngineResult<Vec<_>>>()?;

        let mut cells = self
            .cells
            .write()
            .map_err(|_| EngineError::Internal("cell store lock poisoned".into()))?;
        let count = records.len();
        match self.schema.array_type() {
            ArrayType::Sparse => cells.extend(records),
            ArrayType::Dense => {
                for record in records {
                    match cells.iter_mut().find(|c| c.coords == record.coords) {
                        Some(existing) => *existing = record,
                        None => cells.push(record),
                    }
                }
            }
        }
        debug!(uri = %self.uri, cells = count, "stored cells");
        Ok(())
    }

    /// Coerces every value to its column type and checks domains and nulls
    fn normalize(&self, record: CellRecord) -> EngineResult<CellRecord> {
        if record.coords.len() != self.schema.dimensions.len()
            || record.values.len() != self.schema.attributes.len()
        {
            return Err(EngineError::InvalidWrite(
                "cell does not match the schema arity".into(),
            ));
        }

        let mut coords = Vec::with_capacity(record.coords.len());
        for (dim, value) in self.schema.dimensions.iter().zip(record.coords) {
            let coerced = value.coerce(dim.datatype).ok_or(EngineError::CoordinateType {
                dimension: dim.name.clone(),
                expected: dim.datatype,
                found: value.kind_name(),
            })?;
            if let Some((lo, hi)) = &dim.domain {
                let domain = Range {
                    lo: lo.clone(),
                    hi: hi.clone(),
                };
                if !domain.contains(&coerced) {
                    return Err(EngineError::OutOfDomain {
                        dimension: dim.name.clone(),
                        value: coerced.to_string(),
                    });
                }
            }
            coords.push(coerced);
        }

        let mut values = Vec::with_capacity(record.values.len());
        for (attr, value) in self.schema.attributes.iter().zip(record.values) {
            match value {
                Some(value) => {
                    let coerced = value.coerce(attr.datatype).ok_or_else(|| {
                        EngineError::InvalidWrite(format!(
                            "value {} does not fit attribute '{}' ({})",
                            value, attr.name, attr.datatype
                        ))
                    })?;
                    values.push(Some(coerced));
                }
                None if attr.nullable => values.push(None),
                None => {
                    return Err(EngineError::InvalidWrite(format!(
                        "attribute '{}' is not nullable",
                        attr.name
                    )))
                }
            }
        }

        Ok(CellRecord { coords, values })
    }

    /// Copy of all stored cells
    pub(crate) fn snapshot(&self) -> EngineResult<Vec<CellRecord>> {
        Ok(self.read_cells()?.clone())
    }

    fn read_cells(&self) -> EngineResult<std::sync::RwLockReadGuard<'_, Vec<CellRecord>>> {
        self.cells
            .read()
            .map_err(|_| EngineError::Internal("cell store lock poisoned".into()))
    }
}

/// Array handle opened on an [`ArrayStore`]
#[derive(Debug)]
pub struct MemArray {
    store: Arc<ArrayStore>,
    mode: QueryType,
}

impl MemArray {
    pub fn store(&self) -> &Arc<ArrayStore> {
        &self.store
    }
}

impl Array for MemArray {
    fn uri(&self) -> &str {
        self.store.uri()
    }

    fn schema(&self) -> Arc<ArraySchema> {
        Arc::clone(self.store.schema())
    }

    fn mode(&self) -> QueryType {
        self.mode
    }

    fn new_query(&self) -> EngineResult<Box<dyn Query>> {
        Ok(Box::new(MemQuery::new(Arc::clone(&self.store), self.mode)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::schema::{Attribute, Dimension};
    use crate::engine::types::Datatype;

    fn row(pairs: &[(&str, Option<Scalar>)]) -> BTreeMap<String, Option<Scalar>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn store() -> Arc<ArrayStore> {
        ArrayStore::create(
            "mem://points",
            ArraySchema::sparse()
                .with_dimension(Dimension::new("x", Datatype::Int32).with_domain(0, 100))
                .with_attribute(Attribute::new("a", Datatype::UInt8))
                .with_attribute(Attribute::new("b", Datatype::StringUtf8).nullable()),
        )
        .unwrap()
    }

    #[test]
    fn test_insert_rows_coerces() {
        let store = store();
        store
            .insert_rows(vec![row(&[
                ("x", Some(Scalar::Int(3))),
                ("a", Some(Scalar::Int(7))),
            ])])
            .unwrap();
        let cells = store.snapshot().unwrap();
        assert_eq!(cells[0].values[0], Some(Scalar::UInt(7)));
        assert_eq!(cells[0].values[1], None);
    }

    #[test]
    fn test_insert_rejects_missing_dimension() {
        let err = store()
            .insert_rows(vec![row(&[("a", Some(Scalar::Int(1)))])])
            .unwrap_err();
        assert!(matches!(err, EngineError::Snapshot(_)));
    }

    #[test]
    fn test_insert_rejects_null_in_required_attribute() {
        let err = store()
            .insert_rows(vec![row(&[("x", Some(Scalar::Int(1)))])])
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidWrite(_)));
    }

    #[test]
    fn test_insert_rejects_out_of_domain() {
        let err = store()
            .insert_rows(vec![row(&[
                ("x", Some(Scalar::Int(101))),
                ("a", Some(Scalar::Int(1))),
            ])])
            .unwrap_err();
        assert!(matches!(err, EngineError::OutOfDomain { .. }));
    }

    #[test]
    fn test_open_modes() {
        let store = store();
        let reader = store.open(QueryType::Read);
        let writer = store.open(QueryType::Write);
        assert_eq!(reader.mode(), QueryType::Read);
        assert_eq!(writer.new_query().unwrap().query_type(), QueryType::Write);
        assert_eq!(reader.uri(), "mem://points");
    }
}
