//! # Buffer Errors

use thiserror::Error;

use crate::engine::Datatype;

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Column buffer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("Column '{column}' is not available")]
    ColumnNotFound { column: String },

    #[error("Column '{column}' holds {stored} values; cannot view them as {requested}")]
    TypeMismatch {
        column: String,
        requested: &'static str,
        stored: Datatype,
    },

    #[error("Column '{column}' is not a {expected} column")]
    InvalidColumnKind {
        column: String,
        expected: &'static str,
    },

    #[error("Cell {index} is out of range for column '{column}' ({num_cells} cells)")]
    OutOfRange {
        column: String,
        index: usize,
        num_cells: usize,
    },

    #[error("Cell {index} of column '{column}' is not valid UTF-8")]
    InvalidUtf8 { column: String, index: usize },

    #[error("Invalid buffer shape for column '{column}': {reason}")]
    Shape { column: String, reason: String },
}

impl BufferError {
    pub fn shape(column: impl Into<String>, reason: impl Into<String>) -> Self {
        BufferError::Shape {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Column the error refers to
    pub fn column(&self) -> &str {
        match self {
            BufferError::ColumnNotFound { column }
            | BufferError::TypeMismatch { column, .. }
            | BufferError::InvalidColumnKind { column, .. }
            | BufferError::OutOfRange { column, .. }
            | BufferError::InvalidUtf8 { column, .. }
            | BufferError::Shape { column, .. } => column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_display() {
        let err = BufferError::TypeMismatch {
            column: "qual".into(),
            requested: "i64",
            stored: Datatype::Float32,
        };
        let display = err.to_string();
        assert!(display.contains("qual"));
        assert!(display.contains("float32"));
        assert!(display.contains("i64"));
        assert_eq!(err.column(), "qual");
    }
}
