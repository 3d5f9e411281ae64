//! External-memory priority queue on top of the buffered B-tree.
//!
//! # Design
//!
//! The smallest entries live in a short sorted run in memory; everything
//! else lives in the tree. `small_max` separates the two:
//! - keys below `small_max` go to the run, others to the tree
//! - a full run spills its upper half into the tree, and `small_max` drops
//!   to the smallest spilled key
//! - an empty run is refilled with the tree's leftmost leaf, and `small_max`
//!   becomes the largest key of that leaf
//!
//! # Invariants
//!
//! - The run is sorted and holds at most `2t` entries
//! - Every key in the run is `<=` every key in the tree

use std::collections::VecDeque;

use crate::storage::NodeStore;
use crate::storage::btree::{BufferTree, Entry, Key, TreeError, TreeOptions, Value};

/// Errors from heap operations.
#[derive(Debug)]
pub enum HeapError {
    /// The underlying tree failed.
    Tree(TreeError),
    /// `remove_min` was called on an empty heap.
    Empty,
}

impl std::fmt::Display for HeapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tree(e) => write!(f, "tree error: {e}"),
            Self::Empty => write!(f, "heap is empty"),
        }
    }
}

impl std::error::Error for HeapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tree(e) => Some(e),
            Self::Empty => None,
        }
    }
}

impl From<TreeError> for HeapError {
    fn from(e: TreeError) -> Self {
        Self::Tree(e)
    }
}

/// Min-heap of key-value entries that keeps most of its data in a store.
pub struct ExternalHeap<S: NodeStore> {
    small: VecDeque<Entry>,
    small_capacity: usize,
    small_max: Key,
    big: BufferTree<S>,
}

impl<S: NodeStore> ExternalHeap<S> {
    /// Create an empty heap whose tree lives in `store`.
    #[must_use]
    pub fn new(store: S, options: TreeOptions) -> Self {
        let small_capacity = 2 * options.order;
        Self {
            small: VecDeque::with_capacity(small_capacity),
            small_capacity,
            small_max: Key::MAX,
            big: BufferTree::new(store, options),
        }
    }

    /// The tree holding entries that are not in the in-memory run.
    #[must_use]
    pub const fn tree(&self) -> &BufferTree<S> {
        &self.big
    }

    pub const fn tree_mut(&mut self) -> &mut BufferTree<S> {
        &mut self.big
    }

    /// Keys below this bound are kept in memory.
    #[must_use]
    pub const fn small_max(&self) -> Key {
        self.small_max
    }

    /// Entries currently in the in-memory run.
    #[must_use]
    pub fn in_memory(&self) -> usize {
        self.small.len()
    }

    pub fn add(&mut self, key: Key, value: Value) -> Result<(), HeapError> {
        loop {
            if key >= self.small_max {
                self.big.add(key, value)?;
                return Ok(());
            }
            if self.small.len() < self.small_capacity {
                let entry = (key, value);
                let pos = self.small.partition_point(|e| *e < entry);
                self.small.insert(pos, entry);
                return Ok(());
            }
            // The key may belong to the tree once the bound drops.
            self.spill()?;
        }
    }

    /// Remove and return an entry with the smallest key.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::Empty` if the heap holds nothing.
    pub fn remove_min(&mut self) -> Result<Entry, HeapError> {
        if self.small.is_empty() {
            if self.big.is_empty()? {
                return Err(HeapError::Empty);
            }
            let leaf = self.big.remove_left_leaf()?;
            if let Some(&(key, _)) = leaf.last() {
                self.small_max = key;
            }
            self.small.extend(leaf);
        }
        self.small.pop_front().ok_or(HeapError::Empty)
    }

    pub fn is_empty(&mut self) -> Result<bool, HeapError> {
        Ok(self.small.is_empty() && self.big.is_empty()?)
    }

    /// Move the upper half of the run into the tree.
    fn spill(&mut self) -> Result<(), HeapError> {
        for _ in 0..self.small_capacity / 2 {
            let Some(&(key, value)) = self.small.back() else {
                break;
            };
            self.big.add(key, value)?;
            self.small.pop_back();
            self.small_max = key;
        }
        tracing::trace!("spilled run to tree, bound now {}", self.small_max);
        Ok(())
    }
}
