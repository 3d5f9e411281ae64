// Test code is allowed to use expect() for convenience.
#![cfg_attr(test, allow(clippy::expect_used))]

// Life of an insertion:
// 1. The tree resolves its root through the page cache
// 2. Buffer nodes queue the entry until the queue would reach the order
// 3. A full queue is flushed: each entry is routed to a child, splitting
//    full nodes on the way down
// 4. Leaves keep their entries sorted by key
//
// Extraction only ever removes the leftmost leaf, which is enough to build
// an external-memory priority queue on top (see `heap`).

pub mod config;
pub mod heap;
pub mod simulation;
pub mod storage;

#[cfg(test)]
mod e2e_tests;

pub use heap::{ExternalHeap, HeapError};
pub use storage::btree::{BufferTree, TreeError, TreeOptions};
pub use storage::{DirectoryStore, MemoryStore, NodeId, NodeStore, StorageError};
