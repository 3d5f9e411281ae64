//! Test that buffered and unbuffered trees drain the same way.

use crate::e2e_tests::helpers::*;
use crate::storage::MemoryStore;
use crate::storage::btree::{BufferTree, TreeOptions};

#[test]
fn test_buffered_matches_unbuffered() {
    let entries = random_entries(41, 1_000, 2_000, 0);

    let mut buffered = BufferTree::new(MemoryStore::new(), TreeOptions::new(4));
    let mut plain = BufferTree::new(MemoryStore::new(), TreeOptions::new(4).unbuffered());
    add_all(&mut buffered, &entries);
    add_all(&mut plain, &entries);

    let plain_shape = plain.check_invariants().expect("should be valid");
    assert_eq!(plain_shape.pending, 0);

    let from_buffered = drain_all(&mut buffered);
    let from_plain = drain_checked(&mut plain);
    assert_eq!(keys(&from_buffered), keys(&from_plain));
    assert_same_entries(&from_buffered, &from_plain);
    assert_same_entries(&from_plain, &entries);
}
