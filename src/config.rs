//! Query configuration
//!
//! Controls buffer synthesis and default result order:
//! - `init_buffer_bytes`: byte budget of each buffer the session allocates
//! - `sparse_layout` / `dense_layout`: result order applied at construction
//!
//! Loaded from JSON or from `ARRAYQ_INIT_BUFFER_BYTES`; missing fields take
//! their defaults.

use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::Layout;

/// Environment variable overriding `init_buffer_bytes`
pub const INIT_BUFFER_BYTES_ENV: &str = "ARRAYQ_INIT_BUFFER_BYTES";

/// Default byte budget per synthesized buffer (16 MiB)
pub const DEFAULT_INIT_BUFFER_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid query config: {0}")]
    Invalid(String),

    #[error("Cannot parse query config: {0}")]
    Parse(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration of a managed query session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Bytes per synthesized data buffer
    pub init_buffer_bytes: usize,
    /// Result order for sparse reads
    pub sparse_layout: Layout,
    /// Result order for dense reads
    pub dense_layout: Layout,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            init_buffer_bytes: DEFAULT_INIT_BUFFER_BYTES,
            sparse_layout: Layout::Unordered,
            dense_layout: Layout::RowMajor,
        }
    }
}

impl QueryConfig {
    pub fn with_init_buffer_bytes(mut self, bytes: usize) -> Self {
        self.init_buffer_bytes = bytes;
        self
    }

    pub fn with_sparse_layout(mut self, layout: Layout) -> Self {
        self.sparse_layout = layout;
        self
    }

    pub fn with_dense_layout(mut self, layout: Layout) -> Self {
        self.dense_layout = layout;
        self
    }

    /// Parses and validates a JSON config
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, overridden by `ARRAYQ_INIT_BUFFER_BYTES` when set
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_env_value(env::var(INIT_BUFFER_BYTES_ENV).ok().as_deref())
    }

    fn from_env_value(raw: Option<&str>) -> ConfigResult<Self> {
        let config = match raw {
            Some(raw) => {
                let bytes = raw.trim().parse::<usize>().map_err(|_| {
                    ConfigError::Parse(format!(
                        "{} is not a byte count: {:?}",
                        INIT_BUFFER_BYTES_ENV, raw
                    ))
                })?;
                Self::default().with_init_buffer_bytes(bytes)
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.init_buffer_bytes == 0 {
            return Err(ConfigError::Invalid(
                "init_buffer_bytes must be greater than zero".into(),
            ));
        }
        if self.dense_layout == Layout::Unordered {
            return Err(ConfigError::Invalid(
                "dense arrays do not support the unordered layout".into(),
            ));
        }
        Ok(())
    }
}
