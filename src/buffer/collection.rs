//! Column buffer collection
//!
//! Name-keyed set of shared column buffers. Insertion order is kept so
//! results list columns the way they were selected or attached.

use std::collections::HashMap;
use std::sync::Arc;

use super::column::ColumnBuffer;
use super::errors::{BufferError, BufferResult};

/// Buffers of one query, keyed by column name
#[derive(Debug, Clone, Default)]
pub struct ColumnBuffers {
    entries: Vec<(String, Arc<ColumnBuffer>)>,
    index: HashMap<String, usize>,
}

impl ColumnBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the buffer for `name`, returning the replaced one.
    /// A replaced column keeps its position.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        buffer: Arc<ColumnBuffer>,
    ) -> Option<Arc<ColumnBuffer>> {
        let name = name.into();
        match self.index.get(&name) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].1, buffer)),
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, buffer));
                None
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Buffer for `name`
    pub fn at(&self, name: &str) -> BufferResult<&ColumnBuffer> {
        self.get(name).ok_or_else(|| BufferError::ColumnNotFound {
            column: name.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&ColumnBuffer> {
        self.shared(name).map(Arc::as_ref)
    }

    /// Shared handle to the buffer for `name`
    pub fn shared(&self, name: &str) -> Option<&Arc<ColumnBuffer>> {
        self.index.get(name).map(|&slot| &self.entries[slot].1)
    }

    /// Column names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnBuffer)> {
        self.entries
            .iter()
            .map(|(name, buffer)| (name.as_str(), buffer.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn iter_shared(&self) -> impl Iterator<Item = &Arc<ColumnBuffer>> {
        self.entries.iter().map(|(_, buffer)| buffer)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Arc<ColumnBuffer>)> {
        self.entries
            .iter_mut()
            .map(|(name, buffer)| (name.as_str(), buffer))
    }
}
