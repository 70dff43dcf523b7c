//! Frame definitions
//!
//! Fixed-width frame header codec plus the in-memory descriptor and
//! materialized frame types.

use bytes::Bytes;

use crate::error::{MergeError, Result};

/// Header size: Offset (8) + Length (8) = 16 bytes
pub const HEADER_SIZE: u64 = 16;

/// On-disk frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Logical byte position of the payload start
    pub offset: u64,

    /// Payload byte count
    pub length: u64,
}

impl FrameHeader {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Encode to 16 bytes: offset then length, both little-endian
    pub fn encode(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        buf[0..8].copy_from_slice(&self.offset.to_le_bytes());
        buf[8..16].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    /// Decode from the first 16 bytes of `bytes`
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE as usize {
            return Err(MergeError::MalformedHeader { len: bytes.len() });
        }

        let mut offset = [0u8; 8];
        let mut length = [0u8; 8];
        offset.copy_from_slice(&bytes[0..8]);
        length.copy_from_slice(&bytes[8..16]);

        Ok(Self {
            offset: u64::from_le_bytes(offset),
            length: u64::from_le_bytes(length),
        })
    }
}

/// In-memory metadata for one frame of a shard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescriptor {
    /// Logical offset of the payload
    pub offset: u64,

    /// Payload length
    pub length: u64,

    /// Byte position of the payload inside the shard's backing store
    pub position: u64,
}

impl FrameDescriptor {
    /// Descriptor for a frame whose header starts at `header_position`
    pub fn at(header: FrameHeader, header_position: u64) -> Self {
        Self {
            offset: header.offset,
            length: header.length,
            position: header_position + HEADER_SIZE,
        }
    }

    /// Logical end (exclusive)
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    /// Does `[offset, end)` intersect `[start, start + len)`?
    pub fn intersects(&self, start: u64, len: u64) -> bool {
        self.length > 0 && len > 0 && self.offset < start.saturating_add(len) && self.end() > start
    }
}

/// A frame materialized by a read query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub descriptor: FrameDescriptor,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(descriptor: FrameDescriptor, payload: impl Into<Bytes>) -> Self {
        Self {
            descriptor,
            payload: payload.into(),
        }
    }

    pub fn offset(&self) -> u64 {
        self.descriptor.offset
    }

    pub fn length(&self) -> u64 {
        self.descriptor.length
    }

    pub fn end(&self) -> u64 {
        self.descriptor.end()
    }
}
