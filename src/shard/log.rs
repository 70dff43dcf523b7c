//! Shard Log
//!
//! One append-only sequence of frames on a backing store, with an
//! in-memory index rebuilt by replay on open.

use std::io;

use tracing::{debug, info, warn};

use crate::config::SyncStrategy;
use crate::error::{MergeError, Result};

use super::frame::{Frame, FrameDescriptor, FrameHeader, HEADER_SIZE};
use super::replay::{replay, ReplayResult};
use super::store::BackingStore;

/// An append-only shard log
///
/// ## Index
/// Descriptors are kept sorted by `(offset, length, position)`. Appends
/// at non-decreasing offsets land at the tail; anything else is placed by
/// binary insertion, so lookups never depend on the write pattern.
///
/// The longest frame length seen bounds how far back a frame may start
/// and still reach a query window, which lets `query` start with a
/// binary search.
pub struct ShardLog<S: BackingStore> {
    /// Backing store (None once closed)
    store: Option<S>,

    /// Next append position in the backing store
    cursor: u64,

    /// Frame index, sorted by (offset, length, position)
    descriptors: Vec<FrameDescriptor>,

    /// Longest payload in the index
    max_length: u64,

    /// Largest logical `offset + length`
    extent: u64,

    sync_strategy: SyncStrategy,
}

impl<S: BackingStore> ShardLog<S> {
    /// Open a shard over `store`, replaying its frames
    pub fn open(store: S, sync_strategy: SyncStrategy) -> Result<Self> {
        Self::open_with_stats(store, sync_strategy).map(|(log, _)| log)
    }

    /// Open a shard and also hand back the replay statistics
    ///
    /// A torn tail is cut off the store, so later appends never leave
    /// stale bytes behind them for the next replay to misread.
    pub fn open_with_stats(
        mut store: S,
        sync_strategy: SyncStrategy,
    ) -> Result<(Self, ReplayResult)> {
        let (mut descriptors, result) = replay(&store)?;

        if result.torn_bytes > 0 {
            warn!(
                torn_bytes = result.torn_bytes,
                next_position = result.next_position,
                "Truncating torn shard tail"
            );
            store.set_len(result.next_position)?;
        }

        // Replay yields log order; the index wants logical order
        descriptors.sort_by_key(sort_key);
        let max_length = descriptors.iter().map(|d| d.length).max().unwrap_or(0);

        info!(
            frames = result.frames_recovered,
            extent = result.extent,
            torn_bytes = result.torn_bytes,
            "Shard opened"
        );

        let log = Self {
            store: Some(store),
            cursor: result.next_position,
            descriptors,
            max_length,
            extent: result.extent,
            sync_strategy,
        };
        Ok((log, result))
    }

    /// Append `payload` as one frame at logical `offset`.
    ///
    /// Never rewrites earlier frames, even when `offset` overlaps them.
    /// Returns the payload byte count.
    pub fn write(&mut self, payload: &[u8], offset: u64) -> Result<usize> {
        let length = payload.len() as u64;
        if offset.checked_add(length).is_none() {
            return Err(MergeError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "frame end overflows the logical address space",
            )));
        }

        let position = self.cursor;
        let sync_strategy = self.sync_strategy;
        let store = self.store_mut()?;

        // Header and payload go out as one contiguous record
        let header = FrameHeader::new(offset, length);
        let mut record = Vec::with_capacity(HEADER_SIZE as usize + payload.len());
        record.extend_from_slice(&header.encode());
        record.extend_from_slice(payload);

        store.write_at(position, &record)?;
        if sync_strategy == SyncStrategy::EveryWrite {
            store.sync()?;
        }

        let descriptor = FrameDescriptor::at(header, position);
        self.cursor = position + record.len() as u64;
        self.insert(descriptor);

        Ok(payload.len())
    }

    /// Collect frames intersecting `[offset, offset + len)`.
    ///
    /// Frames come back ascending by `(offset, length, position)`.
    /// Returns `EndOfData` when the shard is empty or the window starts at
    /// or past the shard's extent. A payload read failure returns
    /// `PartialQuery` holding the frames read so far.
    pub fn query(&self, offset: u64, len: u64) -> Result<Vec<Frame>> {
        let store = self.store()?;

        if self.descriptors.is_empty() || offset >= self.extent {
            return Err(MergeError::EndOfData);
        }

        let window_end = offset.saturating_add(len);

        // No frame starting at or before `offset - max_length` can reach
        // the window
        let max_length = self.max_length;
        let start = self
            .descriptors
            .partition_point(|d| d.offset.saturating_add(max_length) <= offset);

        let mut frames = Vec::new();
        for descriptor in &self.descriptors[start..] {
            if descriptor.offset >= window_end {
                break;
            }
            if !descriptor.intersects(offset, len) {
                continue;
            }

            match read_payload(store, descriptor) {
                Ok(payload) => frames.push(Frame::new(*descriptor, payload)),
                Err(source) => return Err(MergeError::PartialQuery { frames, source }),
            }
        }

        debug!(offset, len, matched = frames.len(), "Shard query");
        Ok(frames)
    }

    /// Close the backing store. A second call fails with `Closed`.
    pub fn close(&mut self) -> Result<()> {
        let mut store = self.store.take().ok_or(MergeError::Closed)?;
        self.descriptors.clear();
        self.max_length = 0;
        store.close()?;
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Frame index in logical order
    pub fn frames(&self) -> &[FrameDescriptor] {
        &self.descriptors
    }

    pub fn frame_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Largest logical `offset + length` written to this shard
    pub fn extent(&self) -> u64 {
        self.extent
    }

    /// Next append position in the backing store
    pub fn next_position(&self) -> u64 {
        self.cursor
    }

    pub fn is_closed(&self) -> bool {
        self.store.is_none()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn store(&self) -> Result<&S> {
        self.store.as_ref().ok_or(MergeError::Closed)
    }

    fn store_mut(&mut self) -> Result<&mut S> {
        self.store.as_mut().ok_or(MergeError::Closed)
    }

    fn insert(&mut self, descriptor: FrameDescriptor) {
        let key = sort_key(&descriptor);
        let index = self.descriptors.partition_point(|d| sort_key(d) <= key);
        self.descriptors.insert(index, descriptor);

        self.max_length = self.max_length.max(descriptor.length);
        self.extent = self.extent.max(descriptor.end());
    }
}

fn sort_key(descriptor: &FrameDescriptor) -> (u64, u64, u64) {
    (descriptor.offset, descriptor.length, descriptor.position)
}

fn read_payload<S: BackingStore>(store: &S, descriptor: &FrameDescriptor) -> io::Result<Vec<u8>> {
    let mut payload = vec![0u8; descriptor.length as usize];
    let n = store.read_at(descriptor.position, &mut payload)?;
    if n < payload.len() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "frame at position {} truncated: expected {} bytes, got {}",
                descriptor.position, descriptor.length, n
            ),
        ));
    }
    Ok(payload)
}
