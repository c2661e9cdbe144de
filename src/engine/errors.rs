//! # Engine Errors
//!
//! Failures reported by a storage engine implementation. The managed query
//! layer propagates these verbatim and never retries them.

use thiserror::Error;

use super::types::Datatype;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Storage engine errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    // Schema errors
    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    // Range errors
    #[error("Coordinate of kind {found} does not fit dimension '{dimension}' ({expected})")]
    CoordinateType {
        dimension: String,
        expected: Datatype,
        found: &'static str,
    },

    #[error("Invalid range on dimension '{dimension}': lower bound {lo} exceeds upper bound {hi}")]
    InvalidRange {
        dimension: String,
        lo: String,
        hi: String,
    },

    #[error("Value {value} is outside the domain of dimension '{dimension}'")]
    OutOfDomain { dimension: String, value: String },

    // Buffer errors
    #[error("Cannot bind buffer for column '{column}': {reason}")]
    BufferBinding { column: String, reason: String },

    #[error("Buffer for column '{column}' cannot hold a single result cell")]
    BufferTooSmall { column: String },

    // Predicate errors
    #[error("Invalid query condition: {0}")]
    Condition(String),

    // Query lifecycle
    #[error("Invalid query state: {0}")]
    InvalidState(String),

    // Writes
    #[error("Invalid write: {0}")]
    InvalidWrite(String),

    // Snapshot loading
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid array snapshot: {0}")]
    Snapshot(String),

    // Internal
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Create a buffer binding error
    pub fn binding(column: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::BufferBinding {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the failure came from caller input rather than the engine
    pub fn is_usage_error(&self) -> bool {
        !matches!(
            self,
            EngineError::Io(_) | EngineError::Snapshot(_) | EngineError::Internal(_)
        )
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Snapshot(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_errors() {
        assert!(EngineError::UnknownDimension("pos".into()).is_usage_error());
        assert!(EngineError::binding("a", "not nullable").is_usage_error());
        assert!(!EngineError::Io("disk".into()).is_usage_error());
        assert!(!EngineError::Internal("bug".into()).is_usage_error());
    }

    #[test]
    fn test_error_display() {
        let err = EngineError::InvalidRange {
            dimension: "pos".into(),
            lo: "20".into(),
            hi: "10".into(),
        };
        let display = err.to_string();
        assert!(display.contains("pos"));
        assert!(display.contains("20"));
    }
}
