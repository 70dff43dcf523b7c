//! Shard replay
//!
//! Rebuilds a shard's frame index by walking its header stream from
//! position 0.

use tracing::{debug, warn};

use crate::error::Result;

use super::frame::{FrameDescriptor, FrameHeader, HEADER_SIZE};
use super::store::BackingStore;

/// Result of replaying one shard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayResult {
    /// Number of complete frames found
    pub frames_recovered: u64,

    /// Position right after the last complete frame (the append cursor)
    pub next_position: u64,

    /// Bytes past `next_position` that belong to a torn trailing write
    pub torn_bytes: u64,

    /// Largest logical `offset + length` seen
    pub extent: u64,
}

/// Replay all complete frames of `store` in log order.
///
/// Stops cleanly at:
/// 1. End of store
/// 2. A partial header (1..15 bytes)
/// 3. A header whose payload runs past the end of the store
///
/// Only a read error aborts.
pub fn replay<S: BackingStore>(store: &S) -> Result<(Vec<FrameDescriptor>, ReplayResult)> {
    let store_len = store.len()?;

    let mut descriptors = Vec::new();
    let mut result = ReplayResult::default();
    let mut raw = [0u8; HEADER_SIZE as usize];
    let mut position = 0u64;

    loop {
        let n = store.read_at(position, &mut raw)?;
        if n == 0 {
            break;
        }
        if n < raw.len() {
            warn!(position, bytes = n, "Torn frame header at end of shard");
            break;
        }

        let header = FrameHeader::decode(&raw)?;
        let payload_end = (position + HEADER_SIZE).checked_add(header.length);
        match payload_end {
            Some(end) if end <= store_len => {
                let descriptor = FrameDescriptor::at(header, position);
                result.extent = result.extent.max(descriptor.end());
                descriptors.push(descriptor);
                position = end;
            }
            _ => {
                warn!(
                    position,
                    length = header.length,
                    store_len,
                    "Torn frame payload at end of shard"
                );
                break;
            }
        }
    }

    result.frames_recovered = descriptors.len() as u64;
    result.next_position = position;
    result.torn_bytes = store_len.saturating_sub(position);

    debug!(
        frames = result.frames_recovered,
        next_position = result.next_position,
        torn_bytes = result.torn_bytes,
        "Shard replay finished"
    );

    Ok((descriptors, result))
}
