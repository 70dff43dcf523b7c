//! # mergelog
//!
//! One logical byte store backed by several append-only shard logs:
//! - Every write becomes one frame appended to one shard
//! - Every read queries all shards and merges overlapping frames
//! - Shard indexes are rebuilt by log replay on open
//! - Pluggable backing stores (local files, memory)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Merged Store                            │
//! │          write_at → one shard   read_at → all shards         │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │                              │
//!                ▼                              ▼
//!   ┌────────────────────────┐      ┌────────────────────────┐
//!   │   Shard Log 0 .. N-1   │      │      Merge Engine      │
//!   │ (append + replay index)│─────▶│ (priority-ordered fold)│
//!   └───────────┬────────────┘      └────────────────────────┘
//!               │
//!               ▼
//!   ┌────────────────────────┐
//!   │     Backing Store      │
//!   │   (file or memory)     │
//!   └────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use mergelog::{Config, MergedStore};
//!
//! # fn main() -> mergelog::Result<()> {
//! let config = Config::builder().base_path("/tmp/data").shard_count(2).build();
//! let mut store = MergedStore::open(config)?;
//!
//! store.write_at(b"hello", 0)?;
//!
//! let mut buf = [0u8; 5];
//! let n = store.read_at(&mut buf, 0)?;
//! assert_eq!(&buf[..n], b"hello");
//!
//! store.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod shard;
pub mod merge;
pub mod merged;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MergeError, Result};
pub use config::{Config, ShardSelection, SyncStrategy};
pub use merged::{remove, MergedStore};
pub use shard::{BackingStore, FileStore, MemoryStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of mergelog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
