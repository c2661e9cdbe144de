//! # Session Errors

use thiserror::Error;

use crate::buffer::BufferError;
use crate::config::ConfigError;
use crate::engine::EngineError;

use super::state::SessionState;

/// Result type for managed query operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Managed query errors
///
/// Session-level failures name the session. Engine failures pass through
/// unmodified.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("[ManagedQuery:{session}] Column '{column}' is not available in the query results")]
    ColumnNotFound { session: String, column: String },

    #[error("[ManagedQuery:{session}] {source}")]
    Buffer {
        session: String,
        #[source]
        source: BufferError,
    },

    #[error("[ManagedQuery:{session}] Cannot {operation} while the session is {state}")]
    StateViolation {
        session: String,
        operation: &'static str,
        state: SessionState,
    },

    #[error("[ManagedQuery:{session}] Result buffers are still shared; release them first")]
    BuffersInUse { session: String },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Stable classification of a [`SessionError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ColumnNotFound,
    TypeMismatch,
    InvalidColumnKind,
    OutOfRange,
    InvalidUtf8,
    InvalidBuffer,
    StateViolation,
    BuffersInUse,
    Engine,
    Config,
}

impl ErrorKind {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ColumnNotFound => "ARRAYQ_COLUMN_NOT_FOUND",
            ErrorKind::TypeMismatch => "ARRAYQ_TYPE_MISMATCH",
            ErrorKind::InvalidColumnKind => "ARRAYQ_INVALID_COLUMN_KIND",
            ErrorKind::OutOfRange => "ARRAYQ_OUT_OF_RANGE",
            ErrorKind::InvalidUtf8 => "ARRAYQ_INVALID_UTF8",
            ErrorKind::InvalidBuffer => "ARRAYQ_INVALID_BUFFER",
            ErrorKind::StateViolation => "ARRAYQ_STATE_VIOLATION",
            ErrorKind::BuffersInUse => "ARRAYQ_BUFFERS_IN_USE",
            ErrorKind::Engine => "ARRAYQ_ENGINE_ERROR",
            ErrorKind::Config => "ARRAYQ_CONFIG_ERROR",
        }
    }

    /// Whether the caller can branch on the error and carry on with the
    /// same session. Type mismatches and state violations are programming
    /// errors.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorKind::ColumnNotFound | ErrorKind::OutOfRange | ErrorKind::BuffersInUse
        )
    }
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::ColumnNotFound { .. } => ErrorKind::ColumnNotFound,
            SessionError::Buffer { source, .. } => match source {
                BufferError::ColumnNotFound { .. } => ErrorKind::ColumnNotFound,
                BufferError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
                BufferError::InvalidColumnKind { .. } => ErrorKind::InvalidColumnKind,
                BufferError::OutOfRange { .. } => ErrorKind::OutOfRange,
                BufferError::InvalidUtf8 { .. } => ErrorKind::InvalidUtf8,
                BufferError::Shape { .. } => ErrorKind::InvalidBuffer,
            },
            SessionError::StateViolation { .. } => ErrorKind::StateViolation,
            SessionError::BuffersInUse { .. } => ErrorKind::BuffersInUse,
            SessionError::Engine(_) => ErrorKind::Engine,
            SessionError::Config(_) => ErrorKind::Config,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    pub fn is_recoverable(&self) -> bool {
        self.kind().is_recoverable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Datatype;

    #[test]
    fn test_column_not_found_names_session_and_column() {
        let err = SessionError::ColumnNotFound {
            session: "variants".into(),
            column: "qual".into(),
        };
        let display = err.to_string();
        assert!(display.contains("variants"));
        assert!(display.contains("'qual'"));
        assert_eq!(err.code(), "ARRAYQ_COLUMN_NOT_FOUND");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_buffer_kinds() {
        let err = SessionError::Buffer {
            session: "s".into(),
            source: BufferError::TypeMismatch {
                column: "pos".into(),
                requested: "f64",
                stored: Datatype::Int32,
            },
        };
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("pos"));
    }

    #[test]
    fn test_engine_error_is_transparent() {
        let engine = EngineError::UnknownDimension("chrom".into());
        let err = SessionError::from(engine.clone());
        assert_eq!(err.to_string(), engine.to_string());
        assert_eq!(err.code(), "ARRAYQ_ENGINE_ERROR");
    }

    #[test]
    fn test_state_violation_display() {
        let err = SessionError::StateViolation {
            session: "s".into(),
            operation: "select columns",
            state: SessionState::Incomplete,
        };
        assert_eq!(
            err.to_string(),
            "[ManagedQuery:s] Cannot select columns while the session is incomplete"
        );
        assert!(!err.is_recoverable());
    }
}
