//! Test ascending runs followed by a descending run.

use crate::e2e_tests::helpers::*;

#[test]
fn test_ascending_then_descending_order_three() {
    let mut tree = memory_tree(3);

    for key in (0..10).chain(20..30).chain((10..20).rev()) {
        tree.add(key, key).expect("should add");
    }
    tree.check_invariants().expect("tree should be valid");

    let drained = drain_all(&mut tree);
    assert_eq!(drained.len(), 30);
    assert_eq!(keys(&drained), (0..30).collect::<Vec<_>>());
}

#[test]
fn test_long_ascending_run() {
    let mut tree = memory_tree(4);
    for key in 0..1000 {
        tree.add(key, key).expect("should add");
    }

    let drained = drain_checked(&mut tree);
    assert_eq!(keys(&drained), (0..1000).collect::<Vec<_>>());
}

#[test]
fn test_long_descending_run() {
    let mut tree = memory_tree(4);
    for key in (0..1000).rev() {
        tree.add(key, key).expect("should add");
    }

    let drained = drain_all(&mut tree);
    assert_eq!(keys(&drained), (0..1000).collect::<Vec<_>>());
}
