//! Comparison harness: pushes the same random input through the buffered
//! B-tree heap and `std::collections::BinaryHeap`, checks that both drain in
//! the same order and reports how long each took.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use buftree::config::HarnessConfig;
use buftree::storage::btree::Entry;
use buftree::{DirectoryStore, ExternalHeap};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Largest random key; inputs are drawn from `1..=MAX_KEY`.
const MAX_KEY: u64 = 1000;

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "buftree=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match HarnessConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        "Loaded configuration: storage_directory={}, order={}, elements={}, cache_pages={}, seed={}",
        config.storage_directory.display(),
        config.order,
        config.elements,
        config.cache_pages,
        config.seed
    );

    // Each run gets a fresh directory so stale node files never leak in.
    let run_directory = config
        .storage_directory
        .join(format!("run-{}", std::process::id()));
    let result = run(&config, &run_directory);
    if let Err(e) = std::fs::remove_dir_all(&run_directory) {
        tracing::warn!("Failed to remove {}: {e}", run_directory.display());
    }

    match result {
        Ok(true) => {
            tracing::info!("Both heaps drained {} entries in the same order", config.elements);
            ExitCode::SUCCESS
        }
        Ok(false) => {
            tracing::error!("Heaps drained in different orders");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!("Run failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Run both heaps over the same input. Returns whether their output matched.
fn run(config: &HarnessConfig, run_directory: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let input: Vec<u64> = (0..config.elements)
        .map(|_| rng.random_range(1..=MAX_KEY))
        .collect();

    let store = DirectoryStore::open(run_directory)?;
    let mut heap = ExternalHeap::new(store, config.tree_options());

    let started = Instant::now();
    for &x in &input {
        heap.add(x, x)?;
    }
    let fill = started.elapsed();

    let shape = heap.tree_mut().check_invariants()?;
    tracing::debug!(
        "Tree after fill: height={}, nodes={}, leaves={}, pending={}",
        shape.height,
        shape.nodes,
        shape.leaves,
        shape.pending
    );

    let started = Instant::now();
    let mut drained: Vec<Entry> = Vec::with_capacity(input.len());
    while !heap.is_empty()? {
        drained.push(heap.remove_min()?);
    }
    let drain = started.elapsed();
    tracing::info!("Buffered tree heap: fill {fill:?}, drain {drain:?}");

    let started = Instant::now();
    let mut reference: BinaryHeap<Reverse<Entry>> = BinaryHeap::with_capacity(input.len());
    for &x in &input {
        reference.push(Reverse((x, x)));
    }
    let fill = started.elapsed();

    let started = Instant::now();
    let mut expected: Vec<Entry> = Vec::with_capacity(input.len());
    while let Some(Reverse(entry)) = reference.pop() {
        expected.push(entry);
    }
    let drain = started.elapsed();
    tracing::info!("In-memory binary heap: fill {fill:?}, drain {drain:?}");

    Ok(drained == expected)
}
