//! Node storage for the buffered B-tree.
//!
//! Nodes live in a [`NodeStore`] as opaque byte records keyed by [`NodeId`].
//! The tree never talks to the store directly: every access goes through the
//! [`PageCache`](cache::PageCache), which decodes records into live nodes and
//! writes them back on eviction.
//!
//! # Layout
//!
//! - `io`: the store contract and its error type
//! - `memory`: in-memory store, cloned to fork a tree
//! - `directory`: one file per node inside a directory
//! - `cache`: bounded LRU cache of decoded nodes
//! - `btree`: node model, record codec and the tree itself

pub mod btree;
pub mod cache;
mod directory;
mod io;
mod memory;

pub use directory::DirectoryStore;
pub use io::{NodeId, NodeStore, StorageError};
pub use memory::MemoryStore;
