//! Array schema definitions
//!
//! A schema is an ordered list of dimensions (the coordinate space) followed
//! by an ordered list of attributes (the stored values). Together they are
//! the queryable columns of an array.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::errors::{EngineError, EngineResult};
use super::scalar::Scalar;
use super::types::{ArrayType, Datatype};

/// A coordinate axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub datatype: Datatype,
    /// Inclusive bounds. Required for dense arrays, optional for sparse.
    #[serde(default)]
    pub domain: Option<(Scalar, Scalar)>,
}

impl Dimension {
    pub fn new(name: impl Into<String>, datatype: Datatype) -> Self {
        Self {
            name: name.into(),
            datatype,
            domain: None,
        }
    }

    /// Set inclusive domain bounds
    pub fn with_domain(mut self, lo: impl Into<Scalar>, hi: impl Into<Scalar>) -> Self {
        self.domain = Some((lo.into(), hi.into()));
        self
    }

    /// String dimensions are variable-length
    pub fn is_var(&self) -> bool {
        self.datatype.is_var_string()
    }
}

/// A stored value column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub datatype: Datatype,
    #[serde(default)]
    pub var: bool,
    #[serde(default)]
    pub nullable: bool,
}

impl Attribute {
    /// Create an attribute; string types are variable-length
    pub fn new(name: impl Into<String>, datatype: Datatype) -> Self {
        Self {
            name: name.into(),
            datatype,
            var: datatype.is_var_string(),
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark as variable-length (e.g. blobs)
    pub fn var(mut self) -> Self {
        self.var = true;
        self
    }
}

/// Shape and type of one queryable column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub datatype: Datatype,
    pub var: bool,
    pub nullable: bool,
    pub is_dimension: bool,
}

/// Schema of an array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArraySchema {
    pub array_type: ArrayType,
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl ArraySchema {
    pub fn new(array_type: ArrayType) -> Self {
        Self {
            array_type,
            dimensions: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn sparse() -> Self {
        Self::new(ArrayType::Sparse)
    }

    pub fn dense() -> Self {
        Self::new(ArrayType::Dense)
    }

    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn array_type(&self) -> ArrayType {
        self.array_type
    }

    pub fn is_sparse(&self) -> bool {
        self.array_type == ArrayType::Sparse
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    pub fn has_dimension(&self, name: &str) -> bool {
        self.dimensions.iter().any(|d| d.name == name)
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn dimension_index(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Looks up a dimension or attribute by name
    pub fn column(&self, name: &str) -> Option<ColumnInfo> {
        if let Some(dim) = self.dimension(name) {
            return Some(ColumnInfo {
                name: dim.name.clone(),
                datatype: dim.datatype,
                var: dim.is_var(),
                nullable: false,
                is_dimension: true,
            });
        }
        self.attribute(name).map(|attr| ColumnInfo {
            name: attr.name.clone(),
            datatype: attr.datatype,
            var: attr.var,
            nullable: attr.nullable,
            is_dimension: false,
        })
    }

    /// All column names: dimensions first, then attributes, in schema order
    pub fn column_names(&self) -> Vec<String> {
        self.dimensions
            .iter()
            .map(|d| d.name.clone())
            .chain(self.attributes.iter().map(|a| a.name.clone()))
            .collect()
    }

    /// Checks structural rules:
    /// - at least one dimension
    /// - unique column names
    /// - domains well-formed and typed
    /// - dense dimensions are integral with a domain
    pub fn validate(&self) -> EngineResult<()> {
        if self.dimensions.is_empty() {
            return Err(EngineError::InvalidSchema(
                "schema must declare at least one dimension".into(),
            ));
        }

        let mut seen = HashSet::new();
        for name in self.column_names() {
            if name.is_empty() {
                return Err(EngineError::InvalidSchema("empty column name".into()));
            }
            if !seen.insert(name.clone()) {
                return Err(EngineError::InvalidSchema(format!(
                    "duplicate column name '{}'",
                    name
                )));
            }
        }

        for dim in &self.dimensions {
            if let Some((lo, hi)) = &dim.domain {
                let (lo, hi) = match (lo.coerce(dim.datatype), hi.coerce(dim.datatype)) {
                    (Some(lo), Some(hi)) => (lo, hi),
                    _ => {
                        return Err(EngineError::InvalidSchema(format!(
                            "domain of dimension '{}' does not match {}",
                            dim.name, dim.datatype
                        )))
                    }
                };
                if lo.compare(&hi) == Some(std::cmp::Ordering::Greater) {
                    return Err(EngineError::InvalidSchema(format!(
                        "domain of dimension '{}' is empty",
                        dim.name
                    )));
                }
            }
            if self.array_type == ArrayType::Dense
                && (!dim.datatype.is_integral() || dim.domain.is_none())
            {
                return Err(EngineError::InvalidSchema(format!(
                    "dense dimension '{}' must be integral with a domain",
                    dim.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variants_schema() -> ArraySchema {
        ArraySchema::sparse()
            .with_dimension(Dimension::new("contig", Datatype::StringAscii))
            .with_dimension(Dimension::new("pos", Datatype::UInt32).with_domain(0u32, 1_000_000u32))
            .with_attribute(Attribute::new("qual", Datatype::Float32))
            .with_attribute(Attribute::new("filter", Datatype::StringUtf8).nullable())
    }

    #[test]
    fn test_column_lookup() {
        let schema = variants_schema();
        let contig = schema.column("contig").unwrap();
        assert!(contig.is_dimension);
        assert!(contig.var);

        let filter = schema.column("filter").unwrap();
        assert!(!filter.is_dimension);
        assert!(filter.var);
        assert!(filter.nullable);

        assert!(schema.column("missing").is_none());
    }

    #[test]
    fn test_column_names_dims_first() {
        assert_eq!(
            variants_schema().column_names(),
            vec!["contig", "pos", "qual", "filter"]
        );
    }

    #[test]
    fn test_attribute_vs_dimension() {
        let schema = variants_schema();
        assert!(schema.has_attribute("qual"));
        assert!(!schema.has_attribute("pos"));
        assert!(schema.has_dimension("pos"));
    }

    #[test]
    fn test_validate_accepts_good_schema() {
        variants_schema().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let schema = ArraySchema::sparse()
            .with_dimension(Dimension::new("x", Datatype::Int32))
            .with_attribute(Attribute::new("x", Datatype::Int32));
        assert!(matches!(schema.validate(), Err(EngineError::InvalidSchema(_))));
    }

    #[test]
    fn test_validate_rejects_dense_without_domain() {
        let schema = ArraySchema::dense().with_dimension(Dimension::new("row", Datatype::Int64));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_domain() {
        let schema = ArraySchema::sparse()
            .with_dimension(Dimension::new("x", Datatype::Int32).with_domain(10, 1));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_schema_json() {
        let json = r#"{
            "array_type": "dense",
            "dimensions": [{"name": "row", "datatype": "int64", "domain": [0, 99]}],
            "attributes": [{"name": "v", "datatype": "float64", "nullable": true}]
        }"#;
        let schema: ArraySchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.array_type(), ArrayType::Dense);
        assert_eq!(
            schema.dimensions[0].domain,
            Some((Scalar::Int(0), Scalar::Int(99)))
        );
        assert!(schema.attributes[0].nullable);
        assert!(!schema.attributes[0].var);
        schema.validate().unwrap();
    }
}
