//! Error types for code access.

use alloy_primitives::Address;
use thiserror::Error;

use crate::TreeKey;

/// Errors returned by a [`TreeReader`](crate::TreeReader) lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Key not found in tree
    #[error("key not found: {0:?}")]
    NotFound(TreeKey),

    /// The backing store failed to answer
    #[error("tree backend error: {0}")]
    Backend(String),
}

/// Errors that can occur while reading contract code.
#[derive(Debug, Error)]
pub enum CodeError {
    /// `start` is greater than `end` on a range query.
    #[error("start {start} can't be bigger than end {end}")]
    InvalidRange { start: u64, end: u64 },

    /// No allowed range authorizes the requested bytes.
    #[error("invalid asked range [{start}, {end}] of {address} isn't part of any allowed range")]
    UnauthorizedRange {
        address: Address,
        start: u64,
        end: u64,
    },

    /// The requested range runs past the end of the code.
    #[error("range [{start}, {end}] out of bounds for code of length {len}")]
    OutOfBounds { start: u64, end: u64, len: u64 },

    /// A code chunk could not be fetched from the tree.
    #[error("get chunk {chunk} of {address}: {source}")]
    ChunkLookup {
        address: Address,
        chunk: u64,
        #[source]
        source: LookupError,
    },

    /// The code size leaf of a deployed contract is missing.
    #[error("code size leaf of {address} unavailable: {source}")]
    SizeLeafMissing {
        address: Address,
        #[source]
        source: LookupError,
    },
}

impl CodeError {
    /// Returns `true` if the error signals a broken state invariant rather than a bad request or
    /// a storage hiccup.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SizeLeafMissing { .. })
    }
}

/// Result type alias for code access operations.
pub type Result<T> = std::result::Result<T, CodeError>;
