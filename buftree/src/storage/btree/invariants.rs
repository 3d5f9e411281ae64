//! Structural checks for a buffered B-tree.
//!
//! Walks every node reachable from the root and verifies the shape the tree
//! promises between public operations. Used by tests and by the comparison
//! harness after each phase.

use crate::storage::NodeStore;
use crate::storage::btree::node::{Key, NodeKind};
use crate::storage::btree::tree::BufferTree;
use crate::storage::io::{NodeId, StorageError};

/// Summary of a tree that passed all checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeShape {
    /// Number of levels; 0 for an empty tree.
    pub height: u64,
    pub nodes: usize,
    pub leaves: usize,
    /// Entries stored in leaves.
    pub entries: usize,
    /// Entries waiting in buffer queues.
    pub pending: usize,
}

impl TreeShape {
    /// Entries in the tree, applied or not.
    #[must_use]
    pub const fn total_entries(&self) -> usize {
        self.entries + self.pending
    }
}

/// A broken structural rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub node: NodeId,
    pub reason: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node {}: {}", self.node, self.reason)
    }
}

/// Error returned by `check_invariants`.
#[derive(Debug)]
pub enum CheckError {
    /// A node could not be read.
    Storage(StorageError),
    Violation(InvariantViolation),
}

impl std::fmt::Display for CheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage error: {e}"),
            Self::Violation(v) => write!(f, "invariant violation at {v}"),
        }
    }
}

impl std::error::Error for CheckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            Self::Violation(_) => None,
        }
    }
}

impl From<StorageError> for CheckError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

/// A node still to visit, with the inclusive key range it may hold.
struct Visit {
    id: NodeId,
    parent: Option<NodeId>,
    level: u64,
    low: Option<Key>,
    high: Option<Key>,
}

fn violation(node: NodeId, reason: String) -> CheckError {
    CheckError::Violation(InvariantViolation { node, reason })
}

fn in_range(key: Key, low: Option<Key>, high: Option<Key>) -> bool {
    low.is_none_or(|low| key >= low) && high.is_none_or(|high| key <= high)
}

impl<S: NodeStore> BufferTree<S> {
    /// Verify the structure of the whole tree.
    ///
    /// Checks, for every node: its parent link and level, key count bounds,
    /// key order, that every key lies within the range its parent routes to
    /// it, and that pending queues are shorter than the order.
    pub fn check_invariants(&mut self) -> Result<TreeShape, CheckError> {
        let options = self.options();
        let Some(root) = self.root_id() else {
            return Ok(TreeShape::default());
        };

        let root_level = self.cache_mut().get(root)?.level;
        let mut shape = TreeShape {
            height: root_level + 1,
            ..TreeShape::default()
        };
        let mut stack = vec![Visit {
            id: root,
            parent: None,
            level: root_level,
            low: None,
            high: None,
        }];

        while let Some(next) = stack.pop() {
            let node = self.cache_mut().get(next.id)?;
            let id = next.id;
            shape.nodes += 1;

            if node.id != id {
                return Err(violation(id, format!("record carries id {}", node.id)));
            }
            if node.parent != next.parent {
                return Err(violation(
                    id,
                    format!("parent is {:?}, expected {:?}", node.parent, next.parent),
                ));
            }
            if node.level != next.level {
                return Err(violation(
                    id,
                    format!("level is {}, expected {}", node.level, next.level),
                ));
            }

            let size = node.size();
            if size > options.max_keys() {
                return Err(violation(id, format!("{size} keys exceeds maximum")));
            }
            if next.parent.is_some() && size < options.min_keys() {
                return Err(violation(id, format!("{size} keys is below minimum")));
            }

            match &node.kind {
                NodeKind::Leaf(entries) => {
                    if node.level != 0 {
                        return Err(violation(id, "leaf above level 0".to_string()));
                    }
                    if entries.windows(2).any(|w| w[0].0 > w[1].0) {
                        return Err(violation(id, "leaf entries out of order".to_string()));
                    }
                    if let Some((key, _)) = entries
                        .iter()
                        .find(|(key, _)| !in_range(*key, next.low, next.high))
                    {
                        return Err(violation(id, format!("leaf key {key} out of range")));
                    }
                    shape.leaves += 1;
                    shape.entries += entries.len();
                }
                NodeKind::Internal(branch) | NodeKind::Buffer { branch, .. } => {
                    if node.level == 0 {
                        return Err(violation(id, "branch at level 0".to_string()));
                    }
                    if next.parent.is_none() && size == 0 {
                        return Err(violation(id, "root branch without keys".to_string()));
                    }
                    if branch.children.len() != branch.keys.len() + 1 {
                        return Err(violation(
                            id,
                            format!(
                                "{} children for {} keys",
                                branch.children.len(),
                                branch.keys.len()
                            ),
                        ));
                    }
                    if branch.keys.windows(2).any(|w| w[0] > w[1]) {
                        return Err(violation(id, "keys out of order".to_string()));
                    }
                    if let Some(key) = branch
                        .keys
                        .iter()
                        .find(|key| !in_range(**key, next.low, next.high))
                    {
                        return Err(violation(id, format!("separator {key} out of range")));
                    }

                    if let NodeKind::Buffer { pending, .. } = &node.kind {
                        if pending.len() >= options.order {
                            return Err(violation(
                                id,
                                format!("{} pending entries, order is {}", pending.len(), options.order),
                            ));
                        }
                        if let Some((key, _)) = pending
                            .iter()
                            .find(|(key, _)| !in_range(*key, next.low, next.high))
                        {
                            return Err(violation(id, format!("pending key {key} out of range")));
                        }
                        shape.pending += pending.len();
                    }

                    for (i, child) in branch.children.iter().enumerate() {
                        stack.push(Visit {
                            id: *child,
                            parent: Some(id),
                            level: node.level - 1,
                            low: if i == 0 { next.low } else { Some(branch.keys[i - 1]) },
                            high: branch.keys.get(i).copied().or(next.high),
                        });
                    }
                }
            }
        }

        Ok(shape)
    }
}
