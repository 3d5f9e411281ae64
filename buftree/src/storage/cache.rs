//! Bounded cache of decoded tree nodes.
//!
//! Every node access in the tree goes through the [`PageCache`]. Nodes are
//! decoded on a miss and encoded again when they leave the cache.
//!
//! # Design
//!
//! - Least-recently-used eviction, tracked by a recency queue (front is the
//!   oldest). Capacity is small: an operation touches one root-to-leaf path
//!   plus a few siblings.
//! - There is no dirty bit. Evicted nodes are always written back, and
//!   `flush` writes every resident node.
//! - Dropping the cache flushes it. That is a safety net only; callers that
//!   care about durability call `flush` themselves.
//!
//! # Invariants
//!
//! - `recency` holds exactly the ids in `resident`
//! - `resident.len() <= capacity` between calls
//! - A resident node is authoritative: the store copy may be stale

use std::collections::{HashMap, VecDeque};

use crate::storage::btree::Node;
use crate::storage::btree::codec::{self, CodecError};
use crate::storage::io::{NodeId, NodeStore, StorageError};

/// Default number of nodes kept resident.
pub const DEFAULT_CACHE_PAGES: usize = 8;

/// LRU cache of decoded nodes over a [`NodeStore`].
pub struct PageCache<S: NodeStore> {
    store: S,
    resident: HashMap<NodeId, Node>,
    recency: VecDeque<NodeId>,
    capacity: usize,
}

impl<S: NodeStore> PageCache<S> {
    /// Create a cache over `store` holding at most `capacity` nodes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(store: S, capacity: usize) -> Self {
        assert!(capacity > 0, "Page cache capacity must be positive");
        Self {
            store,
            resident: HashMap::with_capacity(capacity),
            recency: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resident nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resident.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resident.is_empty()
    }

    /// The underlying store. Resident nodes may be newer than its contents.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[allow(clippy::missing_const_for_fn)] // mutable references can't be const
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Get a node, loading it from the store on a miss.
    pub fn get(&mut self, id: NodeId) -> Result<&Node, StorageError> {
        self.fetch(id)?;
        self.resident.get(&id).ok_or(StorageError::NotFound(id))
    }

    /// Get a node for modification, loading it from the store on a miss.
    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, StorageError> {
        self.fetch(id)?;
        self.resident.get_mut(&id).ok_or(StorageError::NotFound(id))
    }

    /// Allocate an id and insert the node built by `build`.
    ///
    /// The node is only resident until its first eviction or flush.
    pub fn new_node(
        &mut self,
        build: impl FnOnce(NodeId) -> Node,
    ) -> Result<&mut Node, StorageError> {
        self.make_room()?;
        let id = self.store.allocate_id()?;
        let node = build(id);
        assert_eq!(node.id, id, "node built for id {id} has id {}", node.id);

        self.resident.insert(id, node);
        self.recency.push_back(id);
        self.resident.get_mut(&id).ok_or(StorageError::NotFound(id))
    }

    /// Remove a node from the cache and the store, returning its last state.
    pub fn delete(&mut self, id: NodeId) -> Result<Node, StorageError> {
        self.fetch(id)?;
        self.store.remove(id)?;
        self.recency.retain(|r| *r != id);
        self.resident.remove(&id).ok_or(StorageError::NotFound(id))
    }

    /// Write every resident node back to the store.
    ///
    /// Nodes stay resident.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        for (id, node) in &self.resident {
            self.store.store(*id, &codec::encode(node))?;
        }
        Ok(())
    }

    /// Make `id` resident and most recently used.
    fn fetch(&mut self, id: NodeId) -> Result<(), StorageError> {
        if self.resident.contains_key(&id) {
            if let Some(pos) = self.recency.iter().position(|r| *r == id) {
                self.recency.remove(pos);
            }
            self.recency.push_back(id);
            return Ok(());
        }

        let bytes = self.store.load(id)?;
        let node = match codec::decode(&bytes) {
            Ok(node) => node,
            Err(e @ (CodecError::Malformed(_) | CodecError::Empty)) => {
                return Err(StorageError::Corruption(format!("node {id}: {e}")));
            }
            Err(CodecError::UnknownKind) => {
                panic!("node {id}: record has an unknown node kind")
            }
        };
        if node.id != id {
            return Err(StorageError::Corruption(format!(
                "record stored under node {id} belongs to node {}",
                node.id
            )));
        }

        self.make_room()?;
        self.resident.insert(id, node);
        self.recency.push_back(id);
        Ok(())
    }

    /// Evict least-recently-used nodes until one more fits.
    ///
    /// A node whose write-back fails stays resident.
    fn make_room(&mut self) -> Result<(), StorageError> {
        while self.resident.len() >= self.capacity {
            let Some(&victim) = self.recency.front() else {
                break;
            };
            if let Some(node) = self.resident.get(&victim) {
                self.store.store(victim, &codec::encode(node))?;
            }
            tracing::trace!("evicted node {victim}");
            self.recency.pop_front();
            self.resident.remove(&victim);
        }
        Ok(())
    }
}

impl<S: NodeStore> Drop for PageCache<S> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("failed to flush page cache on drop: {e}");
        }
    }
}
