//! Test that forked trees evolve independently.

use std::collections::HashSet;

use crate::e2e_tests::helpers::*;
use crate::storage::btree::{BufferTree, Entry, TreeOptions};
use crate::storage::{DirectoryStore, MemoryStore, NodeStore};

fn values(entries: &[Entry]) -> HashSet<u64> {
    entries.iter().map(|(_, value)| *value).collect()
}

#[test]
fn test_fork_with_disjoint_additions() {
    let mut a = memory_tree(3);
    let shared: Vec<Entry> = (0..200).map(|k| (k, k)).collect();
    add_all(&mut a, &shared);

    let mut b = a.fork().expect("should fork");
    let only_a: Vec<Entry> = (1000..1100).map(|k| (k, k)).collect();
    let only_b: Vec<Entry> = (2000..2150).map(|k| (k, k)).collect();
    add_all(&mut a, &only_a);
    add_all(&mut b, &only_b);

    let drained_a = drain_all(&mut a);
    let drained_b = drain_all(&mut b);

    assert_eq!(drained_a.len(), 300);
    assert_eq!(drained_b.len(), 350);
    assert_same_entries(&drained_a, &[shared.as_slice(), only_a.as_slice()].concat());
    assert_same_entries(&drained_b, &[shared.as_slice(), only_b.as_slice()].concat());
}

/// Fork a tree of `size1` entries, grow and partly drain the fork, then
/// drain both.
fn fork_then_drain_some<S, T>(
    mut tree1: BufferTree<S>,
    fork: impl FnOnce(&mut BufferTree<S>) -> BufferTree<T>,
) where
    S: NodeStore,
    T: NodeStore,
{
    let t = tree1.options().order;
    let (size1, size2) = (600, 1400);
    let base = random_entries(21, size1, 5_000, 0);
    add_all(&mut tree1, &base);

    let mut tree2 = fork(&mut tree1);
    let extra = random_entries(22, size2, 5_000, 1_000_000);
    add_all(&mut tree2, &extra);

    let mut removed = Vec::new();
    for _ in 0..=size1 / (t - 1) {
        removed.extend(tree2.remove_left_leaf().expect("should remove leaf"));
    }
    tree2.check_invariants().expect("fork should stay valid");

    let final1 = drain_all(&mut tree1);
    let final2 = drain_all(&mut tree2);

    assert_eq!(final1.len(), size1);
    assert_same_entries(&final1, &base);
    assert_eq!(final2.len(), size1 + size2 - removed.len());
    assert_non_decreasing(&final2);

    // Nothing added to the fork shows up in the original, and nothing
    // removed from the fork comes back.
    let extra_values = values(&extra);
    assert!(final1.iter().all(|(_, v)| !extra_values.contains(v)));
    let removed_values = values(&removed);
    assert!(final2.iter().all(|(_, v)| !removed_values.contains(v)));
    assert_eq!(
        values(&final2).len() + removed_values.len(),
        size1 + size2
    );
}

#[test]
fn test_fork_memory_store_order_six() {
    fork_then_drain_some(memory_tree(6), |tree| tree.fork().expect("should fork"));
}

#[test]
fn test_fork_directory_store_order_six() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let store = DirectoryStore::open(dir.path().join("original")).expect("should open");
    let tree = BufferTree::new(store, TreeOptions::new(6));

    let fork_dir = dir.path().join("fork");
    fork_then_drain_some(tree, |tree| {
        tree.fork_with(|store| store.fork_to(&fork_dir))
            .expect("should fork")
    });
}

#[test]
fn test_fork_of_empty_tree() {
    let mut a = BufferTree::new(MemoryStore::new(), TreeOptions::new(2));
    let mut b = a.fork().expect("should fork");
    b.add(1, 1).expect("should add");

    assert!(a.is_empty().expect("should check"));
    assert_eq!(drain_all(&mut b), vec![(1, 1)]);
}
