//! Test structural bounds after every insertion and removal.

use crate::e2e_tests::helpers::*;
use crate::storage::MemoryStore;
use crate::storage::btree::{BufferTree, TreeOptions};

fn check_every_step(order: usize, seed: u64, count: usize) {
    let options = TreeOptions::new(order).with_cache_pages(3);
    let mut tree = BufferTree::new(MemoryStore::new(), options);
    let entries = random_entries(seed, count, 1_000_000, 0);

    let mut saw_pending = false;
    for (i, &(key, value)) in entries.iter().enumerate() {
        tree.add(key, value).expect("should add");
        let shape = tree.check_invariants().expect("tree should stay valid");
        assert_eq!(shape.total_entries(), i + 1);
        saw_pending |= shape.pending > 0;
    }
    assert!(saw_pending, "buffers should hold pending entries at some point");

    let drained = drain_checked(&mut tree);
    assert_non_decreasing(&drained);
    assert_same_entries(&drained, &entries);
}

#[test]
fn test_order_two() {
    check_every_step(2, 31, 600);
}

#[test]
fn test_order_three() {
    check_every_step(3, 32, 800);
}

#[test]
fn test_order_five() {
    check_every_step(5, 33, 1_000);
}

#[test]
fn test_order_eight() {
    check_every_step(8, 34, 1_500);
}
