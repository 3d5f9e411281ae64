//! Buffered B-tree node types.
//!
//! The tree uses three node kinds:
//! - Leaf nodes: store key-value entries sorted by key
//! - Internal nodes: store separator keys and child ids
//! - Buffer nodes: internal nodes with a FIFO queue of entries that have not
//!   been pushed into the subtree yet
//!
//! Nodes refer to each other only by [`NodeId`]; the page cache resolves ids
//! to nodes on every access.

use std::collections::VecDeque;

use crate::storage::NodeId;

/// Ordering key stored in the tree.
pub type Key = u64;

/// Payload stored next to each key.
pub type Value = u64;

/// A key-value pair as stored in leaves and pending queues.
pub type Entry = (Key, Value);

/// Node type discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Leaf,
    Internal,
    Buffer,
}

/// Separator keys and child links shared by internal and buffer nodes.
///
/// Stores N keys and N+1 child ids.
/// `children[i]` covers keys in `(keys[i-1], keys[i]]`; equal keys may sit on
/// either side of a separator after a leaf split, so routing uses the lower
/// bound and extraction order does not depend on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Branch {
    pub keys: Vec<Key>,
    pub children: Vec<NodeId>,
}

impl Branch {
    /// Index of the child that covers `key`.
    #[must_use]
    pub fn child_index_for(&self, key: Key) -> usize {
        self.keys.partition_point(|k| *k < key)
    }

    /// Position of `child` among the children, if linked here.
    #[must_use]
    pub fn position_of(&self, child: NodeId) -> Option<usize> {
        self.children.iter().position(|c| *c == child)
    }
}

/// Kind-specific node contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Leaf(Vec<Entry>),
    Internal(Branch),
    Buffer {
        branch: Branch,
        pending: VecDeque<Entry>,
    },
}

/// A tree node: identity, linkage and contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    /// Height above the leaves. Leaves are level 0.
    pub level: u64,
    pub kind: NodeKind,
}

impl Node {
    /// Create an empty leaf.
    #[must_use]
    pub const fn new_leaf(id: NodeId, parent: Option<NodeId>) -> Self {
        Self {
            id,
            parent,
            level: 0,
            kind: NodeKind::Leaf(Vec::new()),
        }
    }

    /// Create an empty internal or buffer node.
    #[must_use]
    pub fn new_branch(id: NodeId, parent: Option<NodeId>, level: u64, buffered: bool) -> Self {
        let kind = if buffered {
            NodeKind::Buffer {
                branch: Branch::default(),
                pending: VecDeque::new(),
            }
        } else {
            NodeKind::Internal(Branch::default())
        };
        Self {
            id,
            parent,
            level,
            kind,
        }
    }

    #[must_use]
    pub const fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Leaf(_) => NodeType::Leaf,
            NodeKind::Internal(_) => NodeType::Internal,
            NodeKind::Buffer { .. } => NodeType::Buffer,
        }
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Key count for internal and buffer nodes, entry count for leaves.
    #[must_use]
    pub fn size(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf(entries) => entries.len(),
            NodeKind::Internal(branch) | NodeKind::Buffer { branch, .. } => branch.keys.len(),
        }
    }

    /// Number of queued entries. Always 0 for non-buffer nodes.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        match &self.kind {
            NodeKind::Buffer { pending, .. } => pending.len(),
            _ => 0,
        }
    }

    /// # Panics
    ///
    /// Panics if the node is a leaf.
    #[must_use]
    pub fn branch(&self) -> &Branch {
        match &self.kind {
            NodeKind::Internal(branch) | NodeKind::Buffer { branch, .. } => branch,
            NodeKind::Leaf(_) => panic!("node {} is a leaf, expected a branch", self.id),
        }
    }

    /// # Panics
    ///
    /// Panics if the node is a leaf.
    pub fn branch_mut(&mut self) -> &mut Branch {
        match &mut self.kind {
            NodeKind::Internal(branch) | NodeKind::Buffer { branch, .. } => branch,
            NodeKind::Leaf(_) => panic!("node {} is a leaf, expected a branch", self.id),
        }
    }

    /// # Panics
    ///
    /// Panics if the node is not a leaf.
    pub fn entries_mut(&mut self) -> &mut Vec<Entry> {
        match &mut self.kind {
            NodeKind::Leaf(entries) => entries,
            _ => panic!("node {} is not a leaf", self.id),
        }
    }

    /// # Panics
    ///
    /// Panics if the node is not a buffer.
    pub fn pending_mut(&mut self) -> &mut VecDeque<Entry> {
        match &mut self.kind {
            NodeKind::Buffer { pending, .. } => pending,
            _ => panic!("node {} is not a buffer", self.id),
        }
    }

    /// Insert an entry into a leaf, keeping entries sorted by key.
    ///
    /// The entry goes before any existing entries with an equal key.
    pub fn insert_entry(&mut self, entry: Entry) {
        let entries = self.entries_mut();
        let index = entries.partition_point(|(k, _)| *k < entry.0);
        entries.insert(index, entry);
    }
}
