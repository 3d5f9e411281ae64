//! Test the tree with a cache too small to hold a root-to-leaf path.

use crate::e2e_tests::helpers::*;
use crate::storage::DirectoryStore;
use crate::storage::btree::{BufferTree, TreeOptions};

#[test]
fn test_single_page_cache_on_disk() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let store = DirectoryStore::open(dir.path()).expect("should open");
    let mut tree = BufferTree::new(store, TreeOptions::new(3).with_cache_pages(1));

    let entries = random_entries(51, 400, 5_000, 0);
    add_all(&mut tree, &entries);
    tree.check_invariants().expect("tree should be valid");

    let drained = drain_all(&mut tree);
    assert_non_decreasing(&drained);
    assert_same_entries(&drained, &entries);
}

#[test]
fn test_cache_sizes_agree() {
    let entries = random_entries(52, 600, 800, 0);
    let mut outputs = Vec::new();
    for pages in [1, 2, 8, 64] {
        let options = TreeOptions::new(2).with_cache_pages(pages);
        let mut tree = BufferTree::new(crate::storage::MemoryStore::new(), options);
        add_all(&mut tree, &entries);
        outputs.push(drain_all(&mut tree));
    }
    for output in &outputs[1..] {
        assert_eq!(output, &outputs[0]);
    }
}
