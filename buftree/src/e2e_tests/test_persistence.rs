//! Test resuming a tree from a directory store in a new process.

use crate::e2e_tests::helpers::*;
use crate::storage::btree::{BufferTree, TreeOptions};
use crate::storage::{DirectoryStore, NodeStore};

#[test]
fn test_reopen_after_flush() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let options = TreeOptions::new(4);
    let entries = random_entries(5, 500, 100_000, 0);

    let root = {
        let store = DirectoryStore::open(dir.path()).expect("should open");
        let mut tree = BufferTree::new(store, options);
        add_all(&mut tree, &entries);
        tree.flush_cache().expect("should flush");
        tree.root_id()
    };
    assert!(root.is_some());

    let store = DirectoryStore::open(dir.path()).expect("should reopen");
    let mut tree = BufferTree::open(store, options, root);
    let shape = tree.check_invariants().expect("reopened tree should be valid");
    assert_eq!(shape.total_entries(), 500);

    // New nodes must not reuse ids of persisted ones.
    add_all(&mut tree, &[(1, 1_000_000), (2, 1_000_001)]);
    let drained = drain_all(&mut tree);
    assert_eq!(drained.len(), 502);
    assert_non_decreasing(&drained);
}

#[test]
fn test_reopen_after_partial_drain() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let options = TreeOptions::new(3);
    let entries = random_entries(6, 300, 1_000, 0);

    let (root, first) = {
        let store = DirectoryStore::open(dir.path()).expect("should open");
        let mut tree = BufferTree::new(store, options);
        add_all(&mut tree, &entries);
        let mut first = Vec::new();
        for _ in 0..10 {
            first.extend(tree.remove_left_leaf().expect("should remove"));
        }
        tree.flush_cache().expect("should flush");
        (tree.root_id(), first)
    };

    let store = DirectoryStore::open(dir.path()).expect("should reopen");
    let mut tree = BufferTree::open(store, options, root);
    let rest = drain_all(&mut tree);

    let all = [first.as_slice(), rest.as_slice()].concat();
    assert_non_decreasing(&all);
    assert_same_entries(&all, &entries);
}

#[test]
fn test_drop_flushes_to_directory() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let options = TreeOptions::new(2);

    let root = {
        let store = DirectoryStore::open(dir.path()).expect("should open");
        let mut tree = BufferTree::new(store, options);
        add_all(&mut tree, &[(3, 3), (1, 1), (2, 2)]);
        tree.root_id()
    };

    let mut store = DirectoryStore::open(dir.path()).expect("should reopen");
    let root = root.expect("tree should have a root");
    assert!(store.load(root).is_ok(), "root should have been written on drop");

    let mut tree = BufferTree::open(store, options, Some(root));
    assert_eq!(drain_all(&mut tree), vec![(1, 1), (2, 2), (3, 3)]);
}
