//! Test that equal keys are kept, not merged.

use crate::e2e_tests::helpers::*;

#[test]
fn test_same_key_many_values() {
    let mut tree = memory_tree(3);
    for value in 0..100 {
        tree.add(7, value).expect("should add");
    }
    tree.check_invariants().expect("tree should be valid");

    let drained = drain_all(&mut tree);
    assert_eq!(drained.len(), 100);
    assert!(drained.iter().all(|(key, _)| *key == 7));
    assert_same_entries(&drained, &(0..100).map(|v| (7, v)).collect::<Vec<_>>());
}

#[test]
fn test_few_distinct_keys() {
    let mut tree = memory_tree(2);
    let entries = random_entries(11, 400, 3, 0);
    add_all(&mut tree, &entries);
    tree.check_invariants().expect("tree should be valid");

    let drained = drain_checked(&mut tree);
    assert_non_decreasing(&drained);
    assert_same_entries(&drained, &entries);
}
