//! Deterministic fault injection for storage tests.
//!
//! # Design Principles
//!
//! 1. All node I/O goes through the `NodeStore` trait and can be simulated
//! 2. All randomness is seeded for reproducibility
//! 3. Given the same seed, the same operations fail
//!
//! # Usage
//!
//! ```
//! use buftree::simulation::{FaultConfig, SimulatedStore};
//! use buftree::storage::btree::{BufferTree, TreeOptions};
//!
//! let store = SimulatedStore::with_config(42, FaultConfig::no_faults());
//! let mut tree = BufferTree::new(store, TreeOptions::new(3));
//! tree.add(1, 1)?;
//! # Ok::<(), buftree::TreeError>(())
//! ```

mod storage;

pub use storage::{FaultConfig, SimulatedStore, SimulatedStoreStats};
