//! Merged Store
//!
//! The public logical file: N shard logs behind one address space.
//!
//! ## Responsibilities
//! - Route each write, unsplit, to one shard
//! - Fan reads out to every shard and merge the answers by priority
//! - Track the logical extent across shards
//! - Open/close/remove all shards together

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::{shard_path, Config, ShardSelection};
use crate::error::{MergeError, Result};
use crate::merge::merge_all;
use crate::shard::{BackingStore, FileStore, Frame, ShardLog};

/// A logical byte store merged from several append-only shards
///
/// ## Concurrency Model
/// None internally. Writes take `&mut self`; reads take `&self`. Callers
/// sharing a store across threads wrap it in their own lock.
pub struct MergedStore<S: BackingStore = FileStore> {
    /// Store configuration
    config: Config,

    /// Shard logs, in index order
    shards: Vec<ShardLog<S>>,

    /// Picks the shard for each write
    chooser: ShardChooser,

    /// Largest logical `offset + length` across all shards
    extent: u64,

    closed: bool,
}

impl MergedStore<FileStore> {
    /// Open (or create) the shard files named by `config`
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let mut stores = Vec::with_capacity(config.shard_count);
        for index in 0..config.shard_count {
            stores.push(FileStore::open(&config.shard_path(index))?);
        }

        Self::from_stores(stores, config)
    }

    /// Open with a base path and shard count (convenience method)
    ///
    /// Uses default config otherwise
    pub fn open_path(base: &Path, shard_count: usize) -> Result<Self> {
        let config = Config::builder()
            .base_path(base)
            .shard_count(shard_count)
            .build();
        Self::open(config)
    }
}

impl<S: BackingStore> MergedStore<S> {
    /// Build a store over already opened backing stores.
    ///
    /// The shard count is taken from `stores`. Fails with the first shard
    /// open error; shards opened before it are dropped.
    pub fn from_stores(stores: Vec<S>, mut config: Config) -> Result<Self> {
        config.shard_count = stores.len();
        config.validate()?;

        let mut shards = Vec::with_capacity(stores.len());
        for store in stores {
            shards.push(ShardLog::open(store, config.sync_strategy)?);
        }

        let extent = shards.iter().map(|s| s.extent()).max().unwrap_or(0);

        info!(
            base = %config.base_path.display(),
            shards = shards.len(),
            extent,
            "Merged store opened"
        );

        Ok(Self {
            chooser: ShardChooser::new(config.selection),
            config,
            shards,
            extent,
            closed: false,
        })
    }

    /// Write `buf` at logical `offset`.
    ///
    /// The whole buffer lands as one frame in one shard, or the call
    /// fails. Returns the byte count written.
    pub fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize> {
        self.ensure_open()?;

        let index = self.chooser.choose(self.shards.len());
        let written = self.shards[index].write(buf, offset)?;
        self.extent = self.extent.max(offset + written as u64);

        debug!(shard = index, offset, len = written, "Write routed");
        Ok(written)
    }

    /// Read into `buf` from logical `offset`.
    ///
    /// Steps:
    /// 1. Offset at or past the extent: `EndOfData`
    /// 2. Query every shard for the window
    /// 3. Merge all answers by priority
    /// 4. Copy each frame into positions no earlier frame filled
    ///
    /// Returns the length of the filled prefix of `buf`: the first
    /// position no frame covers ends the read, like end of data. Any shard
    /// failure aborts the read.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.ensure_open()?;

        if offset >= self.extent {
            return Err(MergeError::EndOfData);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let len = buf.len() as u64;
        let mut answers = Vec::with_capacity(self.shards.len());
        for shard in &self.shards {
            match shard.query(offset, len) {
                Ok(frames) => answers.push(frames),
                Err(MergeError::EndOfData) => {}
                Err(e) => return Err(e),
            }
        }

        let frames = merge_all(answers);
        Ok(fill(buf, offset, &frames))
    }

    /// Close every shard.
    ///
    /// All shards are attempted; the first error is returned. A second
    /// call fails with `Closed`.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;

        let mut first_error = None;
        for (index, shard) in self.shards.iter_mut().enumerate() {
            if let Err(e) = shard.close() {
                warn!(shard = index, error = %e, "Shard close failed");
                first_error.get_or_insert(e);
            }
        }

        info!(base = %self.config.base_path.display(), "Merged store closed");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Largest logical `offset + length` written so far
    pub fn extent(&self) -> u64 {
        self.extent
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Shard logs in index order
    pub fn shards(&self) -> &[ShardLog<S>] {
        &self.shards
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(MergeError::Closed);
        }
        Ok(())
    }
}

/// Delete every shard file of the store at `base`.
///
/// Attempts all shards; returns the first error.
pub fn remove(base: &Path, shard_count: usize) -> Result<()> {
    let mut first_error = None;
    for index in 0..shard_count {
        let path = shard_path(base, index);
        if let Err(e) = std::fs::remove_file(&path) {
            debug!(path = %path.display(), error = %e, "Shard remove failed");
            first_error.get_or_insert(MergeError::Io(e));
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Copy `frames` (priority order) into `buf`, which maps to logical
/// `[offset, offset + buf.len())`. Each position takes the byte of the
/// first frame covering it. Returns the length of the contiguous filled
/// prefix.
fn fill(buf: &mut [u8], offset: u64, frames: &[Frame]) -> usize {
    let window_end = offset.saturating_add(buf.len() as u64);
    let mut filled = vec![false; buf.len()];
    let mut count = 0;

    for frame in frames {
        if count == buf.len() {
            break;
        }

        let start = frame.offset().max(offset);
        let end = frame.end().min(window_end);
        if start >= end {
            continue;
        }

        // Buffer-relative bounds
        let mut i = (start - offset) as usize;
        let end = (end - offset) as usize;

        while i < end {
            if filled[i] {
                i += 1;
                continue;
            }

            let run_start = i;
            while i < end && !filled[i] {
                i += 1;
            }

            let src = (offset + run_start as u64 - frame.offset()) as usize;
            buf[run_start..i].copy_from_slice(&frame.payload[src..src + (i - run_start)]);
            filled[run_start..i].fill(true);
            count += i - run_start;
        }
    }

    filled.iter().position(|f| !f).unwrap_or(buf.len())
}

// =============================================================================
// Shard Selection
// =============================================================================

/// Stateful shard chooser built from a `ShardSelection`
enum ShardChooser {
    Random(StdRng),
    RoundRobin { next: usize },
}

impl ShardChooser {
    fn new(selection: ShardSelection) -> Self {
        match selection {
            ShardSelection::Random { seed: Some(seed) } => {
                ShardChooser::Random(StdRng::seed_from_u64(seed))
            }
            ShardSelection::Random { seed: None } => ShardChooser::Random(StdRng::from_entropy()),
            ShardSelection::RoundRobin => ShardChooser::RoundRobin { next: 0 },
        }
    }

    fn choose(&mut self, shard_count: usize) -> usize {
        match self {
            ShardChooser::Random(rng) => rng.gen_range(0..shard_count),
            ShardChooser::RoundRobin { next } => {
                let index = *next % shard_count;
                *next = (index + 1) % shard_count;
                index
            }
        }
    }
}
