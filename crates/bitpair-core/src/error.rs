//! Error types for collection construction helpers.
//!
//! The counting entry points themselves never fail: they return a plain
//! `u64` and validate their shape preconditions with debug assertions only.
//! Errors arise solely when building owned collections and sparse indexes.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while building bitmap collections and sparse indexes.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested collection size does not fit in `usize` bytes.
    #[error("collection size overflows: {n_vectors} vectors x {words_per_vector} words")]
    SizeOverflow {
        /// Number of vectors requested.
        n_vectors: usize,
        /// Words per vector requested.
        words_per_vector: usize,
    },

    /// The allocator returned null for an aligned buffer request.
    #[error("aligned allocation of {bytes} bytes (alignment {alignment}) failed")]
    AllocationFailed {
        /// Requested size in bytes.
        bytes: usize,
        /// Requested alignment in bytes.
        alignment: usize,
    },

    /// A row handed to a builder has the wrong width.
    #[error("row {index} holds {got} words, expected {expected}")]
    WidthMismatch {
        /// Index of the offending row.
        index: usize,
        /// Observed word count.
        got: usize,
        /// Word count of the first row.
        expected: usize,
    },

    /// A caller-provided buffer is shorter than the collection it claims
    /// to hold.
    #[error("buffer holds {got} words, collection needs {needed}")]
    BufferTooSmall {
        /// Observed buffer length in words.
        got: usize,
        /// Required length in words.
        needed: usize,
    },

    /// The collection carries more set bits than a `u32` position index
    /// can address.
    #[error("{count} set bits exceed the u32 sparse index range")]
    PositionOverflow {
        /// Total number of set bits encountered.
        count: usize,
    },
}
