//! Backing store abstraction for tree nodes.
//!
//! This module provides a `NodeStore` trait that abstracts over where node
//! records are kept, allowing the tree to run on an in-memory map, a
//! directory of files, or a fault-injecting simulation in tests.
//!
//! # Design
//!
//! The trait is a minimal key-value contract:
//! - Id allocation (monotonic, never reused)
//! - Load / store / remove of opaque byte records
//!
//! Stores know nothing about node structure; encoding lives in
//! `btree::codec` and is applied by the page cache.

/// Identifier of a node record inside a store.
pub type NodeId = u64;

/// Errors that can occur during storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error.
    Io(std::io::Error),
    /// No record exists for the node id.
    NotFound(NodeId),
    /// Corruption detected.
    Corruption(String),
    /// Injected fault for simulation.
    InjectedFault(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::NotFound(id) => write!(f, "node {id} not found"),
            Self::Corruption(msg) => write!(f, "corruption: {msg}"),
            Self::InjectedFault(msg) => write!(f, "injected fault: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Durable mapping from node id to serialized node bytes.
///
/// # Implementation Notes
///
/// Implementations must ensure:
/// - `allocate_id` never returns an id that was handed out before, including
///   ids allocated by a previous instance over the same persisted state
/// - `load` returns the bytes of the last `store` for that id
/// - `remove` of an absent id succeeds
pub trait NodeStore {
    /// Reserve a fresh node id.
    fn allocate_id(&mut self) -> Result<NodeId, StorageError>;

    /// Read the record for `id`.
    ///
    /// Returns `StorageError::NotFound` if no record exists.
    fn load(&mut self, id: NodeId) -> Result<Vec<u8>, StorageError>;

    /// Insert or replace the record for `id`.
    fn store(&mut self, id: NodeId, bytes: &[u8]) -> Result<(), StorageError>;

    /// Remove the record for `id`, if any.
    fn remove(&mut self, id: NodeId) -> Result<(), StorageError>;
}

impl<S: NodeStore + ?Sized> NodeStore for &mut S {
    fn allocate_id(&mut self) -> Result<NodeId, StorageError> {
        (**self).allocate_id()
    }

    fn load(&mut self, id: NodeId) -> Result<Vec<u8>, StorageError> {
        (**self).load(id)
    }

    fn store(&mut self, id: NodeId, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).store(id, bytes)
    }

    fn remove(&mut self, id: NodeId) -> Result<(), StorageError> {
        (**self).remove(id)
    }
}
