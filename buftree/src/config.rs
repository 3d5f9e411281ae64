//! Comparison harness configuration.
//!
//! This module loads the settings of the `buftree` binary from environment
//! variables.
//!
//! # Environment Variables
//!
//! - `BUFTREE_STORAGE_DIRECTORY`: Directory for node files (default: `./storage`)
//! - `BUFTREE_ORDER`: Tree order `t` (default: `8`, at least `2`)
//! - `BUFTREE_ELEMENTS`: Number of random entries to push through both heaps (default: `1000`)
//! - `BUFTREE_CACHE_PAGES`: Page cache capacity in nodes (default: `8`, at least `1`)
//! - `BUFTREE_SEED`: Seed for the random input (default: `5489`)
//!
//! # Invariants
//!
//! - `order >= 2`
//! - `cache_pages >= 1`

use std::path::PathBuf;

use crate::storage::btree::TreeOptions;

/// Harness configuration.
///
/// # Post-conditions
///
/// When constructed via `from_env()`, `order` and `cache_pages` are valid
/// for `TreeOptions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Directory where each run creates its own store directory.
    pub storage_directory: PathBuf,
    pub order: usize,
    pub elements: usize,
    pub cache_pages: usize,
    pub seed: u64,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            storage_directory: PathBuf::from(Self::DEFAULT_STORAGE_DIRECTORY),
            order: Self::DEFAULT_ORDER,
            elements: Self::DEFAULT_ELEMENTS,
            cache_pages: Self::DEFAULT_CACHE_PAGES,
            seed: Self::DEFAULT_SEED,
        }
    }
}

impl HarnessConfig {
    pub const DEFAULT_STORAGE_DIRECTORY: &'static str = "./storage";
    pub const DEFAULT_ORDER: usize = 8;
    pub const DEFAULT_ELEMENTS: usize = 1000;
    pub const DEFAULT_CACHE_PAGES: usize = 8;
    /// The default seed of a 32-bit Mersenne Twister.
    pub const DEFAULT_SEED: u64 = 5489;

    /// Load configuration from environment variables.
    ///
    /// Unset variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but not a valid number, or if
    /// `BUFTREE_ORDER` is below 2 or `BUFTREE_CACHE_PAGES` is 0.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`HarnessConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let storage_directory = lookup("BUFTREE_STORAGE_DIRECTORY")
            .map_or_else(|| PathBuf::from(Self::DEFAULT_STORAGE_DIRECTORY), PathBuf::from);
        let order = parse_number(&lookup, "BUFTREE_ORDER", Self::DEFAULT_ORDER, 2)?;
        let elements = parse_number(&lookup, "BUFTREE_ELEMENTS", Self::DEFAULT_ELEMENTS, 0)?;
        let cache_pages =
            parse_number(&lookup, "BUFTREE_CACHE_PAGES", Self::DEFAULT_CACHE_PAGES, 1)?;
        let seed = parse_number(&lookup, "BUFTREE_SEED", Self::DEFAULT_SEED, 0)?;

        Ok(Self {
            storage_directory,
            order,
            elements,
            cache_pages,
            seed,
        })
    }

    /// Tree options for this configuration.
    #[must_use]
    pub const fn tree_options(&self) -> TreeOptions {
        TreeOptions::new(self.order).with_cache_pages(self.cache_pages)
    }
}

/// Parse a numeric variable, falling back to `default` when unset.
///
/// # Errors
///
/// Returns an error if the value is not a number or is below `min`.
fn parse_number<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
    min: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
{
    let Some(value) = lookup(name) else {
        return Ok(default);
    };
    let parsed = value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("'{value}' is not a valid number"),
        })?;
    if parsed < min {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("must be at least {min}, got {parsed}"),
        });
    }
    Ok(parsed)
}
