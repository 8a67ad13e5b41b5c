//! Error type for the checked constructors.
//!
//! Kernels do not return these: a bad slice passed to a kernel is caller
//! misuse and panics with the same message, like an out-of-range index.

use thiserror::Error;

/// Precondition violations detected by `lanedot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// `offset + len` runs past the end of the sequence.
    #[error("slice out of bounds: offset {offset} + len {len} > size {size}")]
    OutOfBounds {
        /// Start of the requested range.
        offset: usize,
        /// Number of elements requested.
        len: usize,
        /// Length of the underlying sequence.
        size: usize,
    },

    /// `offset + len` does not fit in `usize`.
    #[error("slice bounds overflow: offset {offset} + len {len}")]
    OffsetOverflow {
        /// Start of the requested range.
        offset: usize,
        /// Number of elements requested.
        len: usize,
    },

    /// Lane width outside `1..=MAX_LANES`.
    #[error("invalid lane width {0}: must be in 1..={max}", max = crate::MAX_LANES)]
    InvalidLaneWidth(usize),
}
