//! Buffered B-tree.
//!
//! A balanced multiway tree of order `t` whose internal nodes may be buffer
//! nodes: instead of routing an insertion down right away, a buffer node
//! queues it and pushes the whole queue down once it would reach `t`
//! entries. The tree supports bulk insertion and removal of the leftmost
//! leaf, which is what an external-memory priority queue needs.
//!
//! # Design
//!
//! - Nodes refer to each other by id only. Every access goes through the
//!   page cache, and no node reference is held across another cache call.
//! - Insertion splits full nodes on the way down, so a split never has to
//!   propagate upward.
//! - Extraction rebalances on the way down (rotate from a sibling, or merge
//!   with one), so detaching the leftmost leaf never leaves an underfull
//!   parent.
//! - Any split bumps `structure_version`. A walk that flushed a buffer
//!   compares versions to decide whether the path it was on is still valid,
//!   and restarts from the root if not.
//!
//! # Invariants
//!
//! Between public operations:
//! - Every non-root node has between `t-1` and `2t-1` keys (entries for
//!   leaves); the root has at most `2t-1`
//! - Internal and buffer nodes have one more child than keys
//! - Every pending queue is shorter than `t`
//! - `root` is `None` iff the tree holds nothing

use std::collections::VecDeque;

use crate::storage::NodeStore;
use crate::storage::btree::node::{Branch, Entry, Key, Node, NodeKind, NodeType, Value};
use crate::storage::cache::{DEFAULT_CACHE_PAGES, PageCache};
use crate::storage::io::{NodeId, StorageError};

/// Shape parameters of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeOptions {
    /// Minimum branching factor `t`.
    pub order: usize,
    /// Create buffer nodes (true) or plain internal nodes (false).
    pub buffered: bool,
    /// Number of nodes the page cache keeps resident.
    pub cache_pages: usize,
}

impl TreeOptions {
    /// Buffered tree of the given order with the default cache size.
    ///
    /// # Panics
    ///
    /// Panics if `order < 2`.
    #[must_use]
    pub const fn new(order: usize) -> Self {
        assert!(order >= 2, "Tree order must be at least 2");
        Self {
            order,
            buffered: true,
            cache_pages: DEFAULT_CACHE_PAGES,
        }
    }

    /// Same options without buffer nodes.
    #[must_use]
    pub const fn unbuffered(mut self) -> Self {
        self.buffered = false;
        self
    }

    #[must_use]
    pub const fn with_cache_pages(mut self, cache_pages: usize) -> Self {
        self.cache_pages = cache_pages;
        self
    }

    /// Fewest keys a non-root node may hold.
    #[must_use]
    pub const fn min_keys(&self) -> usize {
        self.order - 1
    }

    /// Most keys any node may hold.
    #[must_use]
    pub const fn max_keys(&self) -> usize {
        2 * self.order - 1
    }
}

/// Errors a caller of the tree has to handle.
///
/// Broken internal invariants are not reported here; they panic.
#[derive(Debug)]
pub enum TreeError {
    /// The backing store failed.
    Storage(StorageError),
    /// `remove_left_leaf` was called on an empty tree.
    EmptyTree,
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage error: {e}"),
            Self::EmptyTree => write!(f, "tree is empty"),
        }
    }
}

impl std::error::Error for TreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            Self::EmptyTree => None,
        }
    }
}

impl From<StorageError> for TreeError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

/// How an insertion treats the buffer node it is standing on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Queue the entry at the first buffer node reached.
    Enqueue,
    /// The entry was already accepted by this node; route it to a child.
    Apply,
}

/// Outcome of rebalancing a node before descending into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rebalance {
    /// Continue the descent from this node.
    Ready(NodeId),
    /// A flush restructured the tree; start again from the root.
    Restart,
}

/// A buffered B-tree over a node store.
pub struct BufferTree<S: NodeStore> {
    cache: PageCache<S>,
    options: TreeOptions,
    root: Option<NodeId>,
    /// Bumped on every split.
    structure_version: u64,
}

impl<S: NodeStore> BufferTree<S> {
    /// Create an empty tree over `store`.
    #[must_use]
    pub fn new(store: S, options: TreeOptions) -> Self {
        Self::open(store, options, None)
    }

    /// Attach to a tree previously persisted in `store`.
    ///
    /// # Pre-conditions
    ///
    /// - `root` is the `root_id()` of a tree that was flushed to `store`
    ///   with the same options, or `None` for an empty tree
    #[must_use]
    pub fn open(store: S, options: TreeOptions, root: Option<NodeId>) -> Self {
        assert!(options.order >= 2, "Tree order must be at least 2");
        Self {
            cache: PageCache::new(store, options.cache_pages),
            options,
            root,
            structure_version: 0,
        }
    }

    /// Current root, for resuming the tree later with `open`.
    #[must_use]
    pub const fn root_id(&self) -> Option<NodeId> {
        self.root
    }

    #[must_use]
    pub const fn options(&self) -> TreeOptions {
        self.options
    }

    /// The backing store. Call `flush_cache` first for an up-to-date view.
    #[must_use]
    pub const fn store(&self) -> &S {
        self.cache.store()
    }

    pub fn store_mut(&mut self) -> &mut S {
        self.cache.store_mut()
    }

    pub(super) const fn cache_mut(&mut self) -> &mut PageCache<S> {
        &mut self.cache
    }

    /// Write every cached node back to the store.
    pub fn flush_cache(&mut self) -> Result<(), TreeError> {
        self.cache.flush()?;
        Ok(())
    }

    /// True iff the tree has no root or an empty root.
    pub fn is_empty(&mut self) -> Result<bool, TreeError> {
        match self.root {
            None => Ok(true),
            Some(root) => Ok(self.cache.get(root)?.size() == 0),
        }
    }

    /// Insert one entry. Equal keys are kept side by side.
    pub fn add(&mut self, key: Key, value: Value) -> Result<(), TreeError> {
        let root = self.load_root()?;
        self.insert_from(root, (key, value), Mode::Enqueue)?;
        Ok(())
    }

    /// Remove the leftmost leaf and return its entries in key order.
    ///
    /// Repeated calls until the tree is empty yield every entry in
    /// non-decreasing key order.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::EmptyTree` if there is nothing to remove.
    pub fn remove_left_leaf(&mut self) -> Result<Vec<Entry>, TreeError> {
        if self.is_empty()? {
            return Err(TreeError::EmptyTree);
        }

        'restart: loop {
            let mut id = self.current_root();
            loop {
                if self.cache.get(id)?.pending_len() > 0 {
                    let version = self.structure_version;
                    self.flush(id)?;
                    if version != self.structure_version {
                        continue 'restart;
                    }
                }

                let (is_leaf, has_parent) = {
                    let node = self.cache.get(id)?;
                    (node.is_leaf(), node.parent.is_some())
                };
                if is_leaf {
                    return Ok(self.detach_leaf(id)?);
                }
                if has_parent {
                    match self.ensure_enough_keys(id)? {
                        Rebalance::Ready(survivor) => id = survivor,
                        Rebalance::Restart => continue 'restart,
                    }
                }
                id = self.cache.get(id)?.branch().children[0];
            }
        }
    }

    fn current_root(&self) -> NodeId {
        let Some(root) = self.root else {
            panic!("tree walk started on an empty tree");
        };
        root
    }

    fn load_root(&mut self) -> Result<NodeId, StorageError> {
        if let Some(root) = self.root {
            return Ok(root);
        }
        let root = self.cache.new_node(|id| Node::new_leaf(id, None))?.id;
        tracing::debug!("created root leaf {root}");
        self.root = Some(root);
        Ok(root)
    }

    /// Walk down from `start` until `entry` is queued or stored in a leaf.
    fn insert_from(
        &mut self,
        start: NodeId,
        entry: Entry,
        mode: Mode,
    ) -> Result<(), StorageError> {
        let (mut id, mut mode) = (start, mode);
        loop {
            let (node_type, size, pending, child) = {
                let node = self.cache.get(id)?;
                let child = match &node.kind {
                    NodeKind::Leaf(_) => None,
                    NodeKind::Internal(branch) | NodeKind::Buffer { branch, .. } => {
                        Some(branch.children[branch.child_index_for(entry.0)])
                    }
                };
                (node.node_type(), node.size(), node.pending_len(), child)
            };

            if node_type == NodeType::Buffer && mode == Mode::Enqueue {
                if pending + 1 >= self.options.order {
                    let version = self.structure_version;
                    self.flush(id)?;
                    if version != self.structure_version {
                        // This node may no longer cover the key.
                        id = self.current_root();
                        continue;
                    }
                }
                self.cache.get_mut(id)?.pending_mut().push_back(entry);
                return Ok(());
            }

            if size == self.options.max_keys() {
                id = self.split_full(id)?;
                mode = Mode::Apply;
                continue;
            }

            match child {
                None => {
                    self.cache.get_mut(id)?.insert_entry(entry);
                    return Ok(());
                }
                Some(child) => {
                    id = child;
                    mode = Mode::Enqueue;
                }
            }
        }
    }

    /// Drain a buffer node's queue, applying entries one at a time.
    ///
    /// An entry applied here may split this node or its ancestors; later
    /// entries see the new structure because they are popped only after the
    /// previous one has landed.
    ///
    /// An entry whose application fails goes back into a queue, so a later
    /// operation can still land it.
    fn flush(&mut self, id: NodeId) -> Result<(), StorageError> {
        let mut applied = 0usize;
        loop {
            let Some(entry) = self.cache.get_mut(id)?.pending_mut().pop_front() else {
                break;
            };
            let version = self.structure_version;
            if let Err(e) = self.insert_from(id, entry, Mode::Apply) {
                self.requeue(id, version, entry);
                return Err(e);
            }
            applied += 1;
        }
        tracing::trace!("flushed {applied} pending entries from node {id}");
        Ok(())
    }

    /// Put back an entry that a flush of `id` popped but could not apply.
    ///
    /// After a split `id` may no longer cover the key; the root always does.
    fn requeue(&mut self, id: NodeId, version: u64, entry: Entry) {
        let target = if version == self.structure_version {
            id
        } else {
            self.current_root()
        };
        match self.cache.get_mut(target) {
            Ok(node) => node.pending_mut().push_front(entry),
            Err(e) => tracing::warn!("lost entry {entry:?} from node {id}: {e}"),
        }
    }

    /// Split a full node around its median and return its parent.
    ///
    /// # Pre-conditions
    ///
    /// - The node holds exactly `2t-1` keys (entries for a leaf)
    ///
    /// # Post-conditions
    ///
    /// - The node keeps the lower `t-1` keys; a new sibling directly to its
    ///   right holds the rest
    /// - A full parent is split first, and a root gains a new parent
    /// - Pending entries above the separator move to the sibling's queue
    fn split_full(&mut self, id: NodeId) -> Result<NodeId, StorageError> {
        let t = self.options.order;
        let (size, parent) = {
            let node = self.cache.get(id)?;
            (node.size(), node.parent)
        };
        assert_eq!(
            size,
            self.options.max_keys(),
            "split of node {id} that is not full"
        );

        let parent_id = match parent {
            Some(parent_id) => {
                if self.cache.get(parent_id)?.size() == self.options.max_keys() {
                    self.split_full(parent_id)?;
                }
                // The parent split may have handed this node to a new parent.
                let Some(parent_id) = self.cache.get(id)?.parent else {
                    panic!("node {id} lost its parent during a split");
                };
                parent_id
            }
            None => self.grow_root(id)?,
        };

        let node = self.cache.get_mut(id)?;
        let level = node.level;
        let (separator, upper) = match &mut node.kind {
            NodeKind::Leaf(entries) => {
                let upper = entries.split_off(t - 1);
                (upper[0].0, NodeKind::Leaf(upper))
            }
            NodeKind::Internal(branch) => {
                let (separator, upper) = split_branch(branch, t);
                (separator, NodeKind::Internal(upper))
            }
            NodeKind::Buffer { branch, pending } => {
                let (separator, upper) = split_branch(branch, t);
                let (keep, moved): (VecDeque<Entry>, VecDeque<Entry>) =
                    pending.drain(..).partition(|(key, _)| *key <= separator);
                *pending = keep;
                (
                    separator,
                    NodeKind::Buffer {
                        branch: upper,
                        pending: moved,
                    },
                )
            }
        };
        let moved_children = match &upper {
            NodeKind::Leaf(_) => Vec::new(),
            NodeKind::Internal(branch) | NodeKind::Buffer { branch, .. } => {
                branch.children.to_vec()
            }
        };

        let sibling = self
            .cache
            .new_node(|sibling| Node {
                id: sibling,
                parent: Some(parent_id),
                level,
                kind: upper,
            })?
            .id;
        for child in moved_children {
            self.cache.get_mut(child)?.parent = Some(sibling);
        }

        let branch = self.cache.get_mut(parent_id)?.branch_mut();
        let Some(pos) = branch.position_of(id) else {
            panic!("node {id} is not a child of its parent {parent_id}");
        };
        branch.keys.insert(pos, separator);
        branch.children.insert(pos + 1, sibling);

        self.structure_version += 1;
        tracing::trace!("split node {id} at key {separator}, new sibling {sibling}");
        Ok(parent_id)
    }

    /// Put a new root above `old_root`.
    fn grow_root(&mut self, old_root: NodeId) -> Result<NodeId, StorageError> {
        let level = self.cache.get(old_root)?.level + 1;
        let buffered = self.options.buffered;
        let root = self
            .cache
            .new_node(|id| {
                let mut root = Node::new_branch(id, None, level, buffered);
                root.branch_mut().children.push(old_root);
                root
            })?
            .id;
        self.cache.get_mut(old_root)?.parent = Some(root);
        self.root = Some(root);
        tracing::debug!("new root {root} at level {level}");
        Ok(root)
    }

    /// Replace an emptied root by its only child.
    fn collapse_root(&mut self, old_root: NodeId, new_root: NodeId) -> Result<(), StorageError> {
        let old = self.cache.delete(old_root)?;
        assert!(old.parent.is_none(), "collapsed node {old_root} is not the root");
        assert_eq!(
            old.pending_len(),
            0,
            "collapsed root {old_root} still has pending entries"
        );
        self.cache.get_mut(new_root)?.parent = None;
        self.root = Some(new_root);
        self.structure_version += 1;
        tracing::debug!("root {old_root} collapsed into {new_root}");
        Ok(())
    }

    /// Unlink the leftmost leaf from its parent, delete it and return its
    /// entries.
    fn detach_leaf(&mut self, id: NodeId) -> Result<Vec<Entry>, StorageError> {
        let min_keys = self.options.min_keys();
        let parent = self.cache.get(id)?.parent;
        if let Some(parent_id) = parent {
            let parent = self.cache.get_mut(parent_id)?;
            let is_root = parent.parent.is_none();
            assert!(
                is_root || parent.size() > min_keys,
                "parent {parent_id} cannot lose a key"
            );
            let branch = parent.branch_mut();
            let Some(pos) = branch.position_of(id) else {
                panic!("leaf {id} is not a child of its parent {parent_id}");
            };
            branch.children.remove(pos);
            branch.keys.remove(pos.min(branch.keys.len() - 1));
            let remaining = branch.keys.is_empty().then(|| branch.children[0]);

            if let Some(remaining) = remaining {
                self.collapse_root(parent_id, remaining)?;
            }
        } else {
            self.root = None;
            tracing::debug!("removed last leaf {id}");
        }

        match self.cache.delete(id)?.kind {
            NodeKind::Leaf(entries) => Ok(entries),
            _ => panic!("node {id} is not a leaf"),
        }
    }

    /// Make sure a non-root node can lose a key before descending into it.
    ///
    /// A node holding exactly `t-1` keys borrows one from a sibling, or is
    /// merged with it. Returns the node to continue from, which differs from
    /// `id` only when `id` was merged into its left sibling.
    fn ensure_enough_keys(&mut self, id: NodeId) -> Result<Rebalance, StorageError> {
        let min_keys = self.options.min_keys();
        let mut parent_checked = false;
        loop {
            let (size, parent) = {
                let node = self.cache.get(id)?;
                (node.size(), node.parent)
            };
            let Some(parent_id) = parent else {
                return Ok(Rebalance::Ready(id));
            };
            if size != min_keys {
                assert!(size > min_keys, "node {id} has only {size} keys");
                return Ok(Rebalance::Ready(id));
            }

            let (pos, sibling, from_right) = {
                let branch = self.cache.get(parent_id)?.branch();
                let Some(pos) = branch.position_of(id) else {
                    panic!("node {id} is not a child of its parent {parent_id}");
                };
                if pos + 1 < branch.children.len() {
                    (pos, branch.children[pos + 1], true)
                } else {
                    (pos, branch.children[pos - 1], false)
                }
            };

            // The sibling's key count must reflect applied entries only.
            if self.cache.get(sibling)?.pending_len() > 0 {
                let version = self.structure_version;
                self.flush(sibling)?;
                if version != self.structure_version {
                    return Ok(Rebalance::Restart);
                }
            }

            if self.cache.get(sibling)?.size() > min_keys {
                if from_right {
                    self.rotate_from_right(parent_id, pos)?;
                } else {
                    self.rotate_from_left(parent_id, pos)?;
                }
                return Ok(Rebalance::Ready(id));
            }

            // The merge takes a key from the parent.
            if !parent_checked {
                if self.ensure_enough_keys(parent_id)? == Rebalance::Restart {
                    return Ok(Rebalance::Restart);
                }
                parent_checked = true;
                continue;
            }

            let left = if from_right { pos } else { pos - 1 };
            return self.merge_children(parent_id, left).map(Rebalance::Ready);
        }
    }

    /// Move the right sibling's first child under `children[pos]`.
    fn rotate_from_right(&mut self, parent_id: NodeId, pos: usize) -> Result<(), StorageError> {
        let (node_id, sibling_id) = {
            let branch = self.cache.get(parent_id)?.branch();
            (branch.children[pos], branch.children[pos + 1])
        };
        let (child, key) = {
            let sibling = self.cache.get_mut(sibling_id)?.branch_mut();
            (sibling.children.remove(0), sibling.keys.remove(0))
        };
        let separator = std::mem::replace(
            &mut self.cache.get_mut(parent_id)?.branch_mut().keys[pos],
            key,
        );

        let node = self.cache.get_mut(node_id)?.branch_mut();
        node.keys.push(separator);
        node.children.push(child);
        self.cache.get_mut(child)?.parent = Some(node_id);

        tracing::trace!("rotated child {child} from {sibling_id} into {node_id}");
        Ok(())
    }

    /// Move the left sibling's last child under `children[pos]`.
    fn rotate_from_left(&mut self, parent_id: NodeId, pos: usize) -> Result<(), StorageError> {
        let (node_id, sibling_id) = {
            let branch = self.cache.get(parent_id)?.branch();
            (branch.children[pos], branch.children[pos - 1])
        };
        let (child, key) = {
            let sibling = self.cache.get_mut(sibling_id)?.branch_mut();
            let (Some(child), Some(key)) = (sibling.children.pop(), sibling.keys.pop()) else {
                panic!("sibling {sibling_id} has no child to lend");
            };
            (child, key)
        };
        let separator = std::mem::replace(
            &mut self.cache.get_mut(parent_id)?.branch_mut().keys[pos - 1],
            key,
        );

        let node = self.cache.get_mut(node_id)?.branch_mut();
        node.keys.insert(0, separator);
        node.children.insert(0, child);
        self.cache.get_mut(child)?.parent = Some(node_id);

        tracing::trace!("rotated child {child} from {sibling_id} into {node_id}");
        Ok(())
    }

    /// Merge `children[left + 1]` into `children[left]` and return the
    /// survivor. Collapses the root if it loses its last key.
    fn merge_children(&mut self, parent_id: NodeId, left: usize) -> Result<NodeId, StorageError> {
        let (survivor, separator, donor) = {
            let branch = self.cache.get_mut(parent_id)?.branch_mut();
            let separator = branch.keys.remove(left);
            let donor = branch.children.remove(left + 1);
            (branch.children[left], separator, donor)
        };

        let (donor_branch, donor_pending) = match self.cache.delete(donor)?.kind {
            NodeKind::Internal(branch) => (branch, VecDeque::new()),
            NodeKind::Buffer { branch, pending } => (branch, pending),
            NodeKind::Leaf(_) => panic!("leaf {donor} cannot be merged"),
        };
        for &child in &donor_branch.children {
            self.cache.get_mut(child)?.parent = Some(survivor);
        }

        let node = self.cache.get_mut(survivor)?;
        if !donor_pending.is_empty() {
            node.pending_mut().extend(donor_pending);
        }
        let Branch { keys, children } = donor_branch;
        let branch = node.branch_mut();
        branch.keys.push(separator);
        branch.keys.extend(keys);
        branch.children.extend(children);
        tracing::trace!("merged node {donor} into {survivor}");

        if self.cache.get(parent_id)?.size() == 0 {
            self.collapse_root(parent_id, survivor)?;
        }
        Ok(survivor)
    }
}

impl<S: NodeStore + Clone> BufferTree<S> {
    /// Flush, copy the store and build an independent tree over the copy.
    #[allow(clippy::disallowed_methods)] // Clone is the fork
    pub fn fork(&mut self) -> Result<Self, TreeError> {
        self.fork_with(|store| Ok(store.clone()))
    }
}

impl<S: NodeStore> BufferTree<S> {
    /// Flush, copy the store with `copy` and build a tree over the copy.
    ///
    /// The copy must be deep: the two trees share no state afterwards.
    pub fn fork_with<T: NodeStore>(
        &mut self,
        copy: impl FnOnce(&S) -> Result<T, StorageError>,
    ) -> Result<BufferTree<T>, TreeError> {
        self.cache.flush()?;
        let store = copy(self.cache.store())?;
        tracing::debug!("forked tree at root {:?}", self.root);
        Ok(BufferTree::open(store, self.options, self.root))
    }
}

/// Split a full branch. `branch` keeps the lower `t-1` keys and `t`
/// children; the median key is returned with the upper half.
fn split_branch(branch: &mut Branch, t: usize) -> (Key, Branch) {
    let keys = branch.keys.split_off(t);
    let children = branch.children.split_off(t);
    let Some(separator) = branch.keys.pop() else {
        panic!("split of a branch without keys");
    };
    (separator, Branch { keys, children })
}
