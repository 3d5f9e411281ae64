//! Test `is_empty` across the lifetime of a tree.

use crate::TreeError;
use crate::e2e_tests::helpers::*;

#[test]
fn test_empty_before_and_after() {
    let mut tree = memory_tree(3);
    assert!(tree.is_empty().expect("should check"));

    tree.add(42, 1).expect("should add");
    assert!(!tree.is_empty().expect("should check"));

    for key in 0..50 {
        tree.add(key, key).expect("should add");
        assert!(!tree.is_empty().expect("should check"));
    }

    let drained = drain_all(&mut tree);
    assert_eq!(drained.len(), 51);
    assert!(tree.is_empty().expect("should check"));
    assert_eq!(tree.root_id(), None);
    assert!(matches!(tree.remove_left_leaf(), Err(TreeError::EmptyTree)));
}

#[test]
fn test_tree_is_reusable_after_draining() {
    let mut tree = memory_tree(2);
    for round in 0..3 {
        for key in 0..20 {
            tree.add(key * round, key).expect("should add");
        }
        assert_eq!(drain_all(&mut tree).len(), 20);
        assert!(tree.is_empty().expect("should check"));
    }

    // Every node created along the way has been deleted.
    tree.flush_cache().expect("should flush");
    assert!(tree.store().is_empty());
}
