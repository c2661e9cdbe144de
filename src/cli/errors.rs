//! CLI-specific error types
//!
//! Every CLI error is fatal: the binary prints it and exits non-zero.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::query::SessionError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(String),
}

impl CliError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        CliError::InvalidArgument(msg.into())
    }

    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            CliError::InvalidArgument(_) => "ARRAYQ_CLI_INVALID_ARGUMENT",
            CliError::Engine(_) => "ARRAYQ_ENGINE_ERROR",
            CliError::Session(e) => e.code(),
            CliError::Config(_) => "ARRAYQ_CONFIG_ERROR",
            CliError::Io(_) => "ARRAYQ_CLI_IO_ERROR",
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Io(format!("JSON error: {}", e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(
            CliError::invalid_argument("x").code(),
            "ARRAYQ_CLI_INVALID_ARGUMENT"
        );
        let session = SessionError::BuffersInUse {
            session: "s".into(),
        };
        assert_eq!(CliError::from(session).code(), "ARRAYQ_BUFFERS_IN_USE");
        let io = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert!(CliError::from(io).to_string().contains("gone"));
    }
}
