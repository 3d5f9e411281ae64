//! Simulated node store for deterministic testing.
//!
//! Wraps a [`MemoryStore`] and fails reads or writes at configured rates:
//! - Load errors
//! - Store and remove errors

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::storage::{MemoryStore, NodeId, NodeStore, StorageError};

/// Configuration for fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaultConfig {
    /// Probability of a load error (0.0 - 1.0).
    pub read_error_rate: f64,
    /// Probability of a store or remove error (0.0 - 1.0).
    pub write_error_rate: f64,
}

impl FaultConfig {
    /// Create a fault config with no faults (for baseline testing).
    #[must_use]
    pub fn no_faults() -> Self {
        Self::default()
    }

    /// Create a fault config with low fault rates (for stress testing).
    #[must_use]
    pub const fn low_faults() -> Self {
        Self {
            read_error_rate: 0.001,
            write_error_rate: 0.001,
        }
    }

    /// Create a fault config with high fault rates (for extreme testing).
    #[must_use]
    pub const fn high_faults() -> Self {
        Self {
            read_error_rate: 0.05,
            write_error_rate: 0.05,
        }
    }
}

/// Statistics about simulated store operations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedStoreStats {
    pub loads: u64,
    pub stores: u64,
    pub removes: u64,
    pub injected_read_errors: u64,
    pub injected_write_errors: u64,
}

/// In-memory node store with seeded fault injection.
///
/// Cloning copies the records, the fault configuration and the RNG state,
/// so a fork fails in the same places as the original would.
#[derive(Debug, Clone)]
pub struct SimulatedStore {
    inner: MemoryStore,
    fault_config: FaultConfig,
    rng: StdRng,
    stats: SimulatedStoreStats,
}

impl SimulatedStore {
    /// Create a fault-free simulated store with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, FaultConfig::default())
    }

    /// Create a simulated store with custom fault configuration.
    #[must_use]
    pub fn with_config(seed: u64, fault_config: FaultConfig) -> Self {
        Self {
            inner: MemoryStore::new(),
            fault_config,
            rng: StdRng::seed_from_u64(seed),
            stats: SimulatedStoreStats::default(),
        }
    }

    #[must_use]
    pub const fn stats(&self) -> &SimulatedStoreStats {
        &self.stats
    }

    /// Update the fault configuration.
    pub const fn set_fault_config(&mut self, config: FaultConfig) {
        self.fault_config = config;
    }

    /// The records currently stored.
    #[must_use]
    pub const fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Check if a fault should be injected based on the given rate.
    fn should_inject_fault(&mut self, rate: f64) -> bool {
        if rate <= 0.0 {
            return false;
        }
        self.rng.random::<f64>() < rate
    }

    fn check_write(&mut self, op: &str, id: NodeId) -> Result<(), StorageError> {
        if self.should_inject_fault(self.fault_config.write_error_rate) {
            self.stats.injected_write_errors += 1;
            return Err(StorageError::InjectedFault(format!(
                "simulated {op} error on node {id}"
            )));
        }
        Ok(())
    }
}

impl NodeStore for SimulatedStore {
    fn allocate_id(&mut self) -> Result<NodeId, StorageError> {
        self.inner.allocate_id()
    }

    fn load(&mut self, id: NodeId) -> Result<Vec<u8>, StorageError> {
        self.stats.loads += 1;
        if self.should_inject_fault(self.fault_config.read_error_rate) {
            self.stats.injected_read_errors += 1;
            return Err(StorageError::InjectedFault(format!(
                "simulated read error on node {id}"
            )));
        }
        self.inner.load(id)
    }

    fn store(&mut self, id: NodeId, bytes: &[u8]) -> Result<(), StorageError> {
        self.stats.stores += 1;
        self.check_write("write", id)?;
        self.inner.store(id, bytes)
    }

    fn remove(&mut self, id: NodeId) -> Result<(), StorageError> {
        self.stats.removes += 1;
        self.check_write("remove", id)?;
        self.inner.remove(id)
    }
}
