//! Test draining a tree and feeding the output back in twice.

use crate::e2e_tests::helpers::*;
use crate::storage::btree::Entry;

#[test]
fn test_reinsert_drained_twice() {
    let mut tree = memory_tree(3);
    let entries: Vec<Entry> = random_entries(3, 700, 10_000, 0)
        .into_iter()
        .map(|(key, _)| (key, key))
        .collect();
    add_all(&mut tree, &entries);

    let first = drain_all(&mut tree);
    assert_eq!(first.len(), entries.len());
    assert_non_decreasing(&first);

    add_all(&mut tree, &first);
    add_all(&mut tree, &first);
    let second = drain_all(&mut tree);

    assert_eq!(second.len(), first.len() * 2);
    assert_non_decreasing(&second);
    for pair in second.chunks(2) {
        assert_eq!(pair[0], pair[1], "entries should come back in equal pairs");
    }
}
