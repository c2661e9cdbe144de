//! JSON array snapshots
//!
//! A snapshot is a schema plus a list of cells keyed by column name:
//!
//! ```json
//! {
//!   "uri": "mem://variants",
//!   "schema": { "array_type": "sparse", "dimensions": [...], "attributes": [...] },
//!   "cells": [ { "pos": 10, "qual": 31.5, "filter": null } ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::errors::{EngineError, EngineResult};
use crate::engine::scalar::Scalar;
use crate::engine::schema::ArraySchema;

use super::store::ArrayStore;

/// Serialized form of an in-memory array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArraySnapshot {
    #[serde(default)]
    pub uri: Option<String>,
    pub schema: ArraySchema,
    #[serde(default)]
    pub cells: Vec<BTreeMap<String, Option<Scalar>>>,
}

impl ArraySnapshot {
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a snapshot file
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| EngineError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    /// Builds a store holding the snapshot's cells. Without a uri the store
    /// is named `mem://<fallback>`.
    pub fn into_store(self, fallback: &str) -> EngineResult<Arc<ArrayStore>> {
        let uri = self
            .uri
            .unwrap_or_else(|| format!("mem://{}", fallback));
        let store = ArrayStore::create(uri, self.schema)?;
        store.insert_rows(self.cells)?;
        Ok(store)
    }
}

impl ArrayStore {
    /// Loads a snapshot file into a new store
    pub fn load(path: &Path) -> EngineResult<Arc<ArrayStore>> {
        let fallback = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "array".to_string());
        ArraySnapshot::load(path)?.into_store(&fallback)
    }
}
