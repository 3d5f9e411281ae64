//! Buffered B-tree over a page cache.
//!
//! # Structure
//!
//! The tree consists of:
//! - Leaf nodes: sorted key-value entries
//! - Internal nodes: separator keys and child ids
//! - Buffer nodes: internal nodes that queue insertions and push them down
//!   in batches
//!
//! # Usage
//!
//! ```
//! use buftree::storage::MemoryStore;
//! use buftree::storage::btree::{BufferTree, TreeOptions};
//!
//! let mut tree = BufferTree::new(MemoryStore::new(), TreeOptions::new(3));
//! for key in [5, 3, 9, 1] {
//!     tree.add(key, key * 10)?;
//! }
//!
//! let mut drained = Vec::new();
//! while !tree.is_empty()? {
//!     drained.extend(tree.remove_left_leaf()?);
//! }
//! assert_eq!(drained, vec![(1, 10), (3, 30), (5, 50), (9, 90)]);
//! # Ok::<(), buftree::TreeError>(())
//! ```

pub mod codec;
mod invariants;
mod node;
mod tree;

pub use invariants::{CheckError, InvariantViolation, TreeShape};
pub use node::{Branch, Entry, Key, Node, NodeKind, NodeType, Value};
pub use tree::{BufferTree, TreeError, TreeOptions};
