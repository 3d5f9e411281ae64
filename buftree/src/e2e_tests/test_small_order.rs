//! Test the smallest order, where the root often drops below `t-1` keys
//! and merges reach it.

use crate::e2e_tests::helpers::*;
use crate::storage::btree::TreeOptions;
use crate::storage::{MemoryStore, btree::BufferTree};

#[test]
fn test_order_two_random() {
    let mut tree = memory_tree(2);
    let entries = random_entries(2, 2_000, 50_000, 0);
    add_all(&mut tree, &entries);
    tree.check_invariants().expect("tree should be valid");

    let drained = drain_checked(&mut tree);
    assert_non_decreasing(&drained);
    assert_same_entries(&drained, &entries);
}

#[test]
fn test_order_two_root_collapses_step_by_step() {
    let mut tree = BufferTree::new(MemoryStore::new(), TreeOptions::new(2).unbuffered());
    for key in 0..64 {
        tree.add(key, key).expect("should add");
    }
    let mut height = tree.check_invariants().expect("should be valid").height;
    assert!(height >= 4);

    let mut next = 0;
    while !tree.is_empty().expect("should check") {
        for (key, _) in tree.remove_left_leaf().expect("should remove") {
            assert_eq!(key, next);
            next += 1;
        }
        let shape = tree.check_invariants().expect("should stay valid");
        // Height only shrinks, one level at a time.
        assert!(shape.height == height || shape.height + 1 == height);
        height = shape.height;
    }
    assert_eq!(next, 64);
    assert_eq!(height, 0);
}

#[test]
fn test_order_two_interleaved() {
    let mut tree = memory_tree(2);
    let entries = random_entries(12, 1_200, 10_000, 0);
    let mut drained = Vec::new();

    for chunk in entries.chunks(40) {
        add_all(&mut tree, chunk);
        drained.extend(tree.remove_left_leaf().expect("should remove"));
        tree.check_invariants().expect("tree should stay valid");
    }
    let rest = drain_checked(&mut tree);
    assert_eq!(drained.len() + rest.len(), entries.len());
    assert_same_entries(&[drained, rest].concat(), &entries);
}
