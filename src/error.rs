//! Error types for mergelog
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::shard::Frame;

/// Result type alias using MergeError
pub type Result<T> = std::result::Result<T, MergeError>;

/// Unified error type for mergelog operations
#[derive(Debug, Error)]
pub enum MergeError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A shard query failed part way through; frames read before the
    /// failure are carried along.
    #[error("shard query failed after {} frames: {source}", frames.len())]
    PartialQuery {
        frames: Vec<Frame>,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Malformed frame header: expected 16 bytes, got {len}")]
    MalformedHeader { len: usize },

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Shard is closed")]
    Closed,

    /// Read position is at or past the known extent. A terminal signal,
    /// not a failure.
    #[error("End of data")]
    EndOfData,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MergeError {
    /// True for the end-of-data signal
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, MergeError::EndOfData)
    }
}
