//! In-memory node store.
//!
//! Cloning a `MemoryStore` copies every record, so two trees built over the
//! original and the clone share nothing after the clone point.

use std::collections::HashMap;

use crate::storage::io::{NodeId, NodeStore, StorageError};

/// Node store backed by a hash map.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    /// Node records by id.
    nodes: HashMap<NodeId, Vec<u8>>,
    /// Last id handed out. Ids start at 1.
    max_id: NodeId,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            max_id: 0,
        }
    }

    /// Number of records currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a record exists for `id`.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }
}

impl NodeStore for MemoryStore {
    fn allocate_id(&mut self) -> Result<NodeId, StorageError> {
        self.max_id += 1;
        Ok(self.max_id)
    }

    fn load(&mut self, id: NodeId) -> Result<Vec<u8>, StorageError> {
        self.nodes
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound(id))
    }

    fn store(&mut self, id: NodeId, bytes: &[u8]) -> Result<(), StorageError> {
        self.nodes.insert(id, bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, id: NodeId) -> Result<(), StorageError> {
        self.nodes.remove(&id);
        Ok(())
    }
}
