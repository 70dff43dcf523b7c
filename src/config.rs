//! Configuration for mergelog
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{MergeError, Result};

/// Main configuration for a merged store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Base path of the shard files. Shard `i` lives at `{base_path}-{i}`:
    ///   {base_path}-0
    ///   {base_path}-1
    ///   ...
    pub base_path: PathBuf,

    /// Number of shards (fixed for the lifetime of the store)
    pub shard_count: usize,

    // -------------------------------------------------------------------------
    // Write Configuration
    // -------------------------------------------------------------------------
    /// How writes are spread across shards
    pub selection: ShardSelection,

    /// Sync strategy: whether appends are followed by a sync
    pub sync_strategy: SyncStrategy,
}

/// Policy for choosing the shard that receives a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardSelection {
    /// Uniformly random shard. A seed makes placement reproducible;
    /// `None` seeds from OS entropy.
    Random { seed: Option<u64> },

    /// Cycle through shards in index order
    RoundRobin,
}

/// Shard sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Leave flushing to the OS
    Never,

    /// Sync the backing store after every append (safest, slowest)
    EveryWrite,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./mergelog"),
            shard_count: 2,
            selection: ShardSelection::Random { seed: None },
            sync_strategy: SyncStrategy::Never,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config for values the store cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(MergeError::Config(
                "shard_count must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Path of the shard file with the given index
    pub fn shard_path(&self, index: usize) -> PathBuf {
        shard_path(&self.base_path, index)
    }
}

/// `{base}-{index}`
pub(crate) fn shard_path(base: &std::path::Path, index: usize) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!("-{}", index));
    PathBuf::from(name)
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the base path of the shard files
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.base_path = path.into();
        self
    }

    /// Set the number of shards
    pub fn shard_count(mut self, count: usize) -> Self {
        self.config.shard_count = count;
        self
    }

    /// Set the shard selection policy
    pub fn selection(mut self, selection: ShardSelection) -> Self {
        self.config.selection = selection;
        self
    }

    /// Shorthand for seeded random selection
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.selection = ShardSelection::Random { seed: Some(seed) };
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
