//! Shard Module
//!
//! One shard is an append-only log of frames. Every logical write becomes
//! exactly one frame in exactly one shard.
//!
//! ## Responsibilities
//! - Encode/decode fixed-width frame headers
//! - Append frames at the shard's cursor (never rewrite)
//! - Replay the header stream on open to rebuild the frame index
//! - Answer window queries with materialized frames
//!
//! ## File Format
//! No file header, magic or version. A shard is frames concatenated from
//! position 0:
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ Frame 1                                       │
//! │ ┌────────────┬────────────┬─────────────────┐ │
//! │ │ Offset (8) │ Length (8) │ Payload (Length)│ │
//! │ └────────────┴────────────┴─────────────────┘ │
//! ├───────────────────────────────────────────────┤
//! │ Frame 2                                       │
//! │ ┌────────────┬────────────┬─────────────────┐ │
//! │ │ Offset (8) │ Length (8) │ Payload (Length)│ │
//! │ └────────────┴────────────┴─────────────────┘ │
//! └───────────────────────────────────────────────┘
//! ```
//! Both header fields are little-endian u64. A trailing frame that is not
//! fully present is treated as end-of-log.

mod frame;
mod log;
mod replay;
mod store;

pub use frame::{Frame, FrameDescriptor, FrameHeader, HEADER_SIZE};
pub use log::ShardLog;
pub use replay::{replay, ReplayResult};
pub use store::{BackingStore, FileStore, MemoryStore};
