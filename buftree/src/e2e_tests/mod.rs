//! End-to-end tests of the buffered B-tree through its public operations.
//!
//! Each test file covers a specific scenario, using seeded inputs so every
//! run inserts and drains the same entries.

#![cfg(test)]


mod test_cache_pressure;
mod test_duplicates;
mod test_empty_contract;
mod test_fork;
mod test_persistence;
mod test_reinsert_drained;
mod test_sequence;
mod test_small_order;
mod test_storage_faults;
mod test_structure_under_load;
mod test_unbuffered;
