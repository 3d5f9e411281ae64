//! Test that store failures surface as errors instead of panics.

use crate::e2e_tests::helpers::*;
use crate::simulation::{FaultConfig, SimulatedStore};
use crate::storage::btree::{BufferTree, TreeOptions};
use crate::storage::{MemoryStore, StorageError};
use crate::TreeError;

fn faulty_tree() -> BufferTree<SimulatedStore> {
    let options = TreeOptions::new(3).with_cache_pages(1);
    let mut tree = BufferTree::new(SimulatedStore::new(17), options);
    add_all(&mut tree, &random_entries(17, 300, 10_000, 0));
    tree
}

#[test]
fn test_write_fault_during_add() {
    let mut tree = faulty_tree();
    tree.store_mut().set_fault_config(FaultConfig {
        write_error_rate: 0.2,
        ..FaultConfig::no_faults()
    });

    let failure = (0..1_000)
        .map(|key| tree.add(key, key))
        .find_map(Result::err)
        .expect("some write should fail");
    assert!(matches!(
        failure,
        TreeError::Storage(StorageError::InjectedFault(_))
    ));
    assert!(tree.store().stats().injected_write_errors > 0);
}

#[test]
fn test_read_fault_during_remove() {
    let mut tree = faulty_tree();
    tree.store_mut().set_fault_config(FaultConfig {
        read_error_rate: 0.2,
        ..FaultConfig::no_faults()
    });

    let mut failure = None;
    for _ in 0..300 {
        match tree.remove_left_leaf() {
            Ok(_) => {}
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    assert!(matches!(
        failure,
        Some(TreeError::Storage(StorageError::InjectedFault(_)))
    ));
}

#[test]
fn test_missing_root_is_not_found() {
    let mut tree = BufferTree::open(MemoryStore::new(), TreeOptions::new(3), Some(99));
    assert!(matches!(
        tree.is_empty(),
        Err(TreeError::Storage(StorageError::NotFound(99)))
    ));
    assert!(matches!(
        tree.add(1, 1),
        Err(TreeError::Storage(StorageError::NotFound(99)))
    ));
}

#[test]
fn test_faults_off_again_is_clean() {
    let mut tree = faulty_tree();
    let stats = *tree.store().stats();
    assert!(stats.loads > 0, "a one-page cache should reload nodes");
    assert_eq!(stats.injected_read_errors + stats.injected_write_errors, 0);

    let drained = drain_checked(&mut tree);
    assert_eq!(drained.len(), 300);
    assert_non_decreasing(&drained);
}
