//! Arena-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during arena operations.
///
/// Variants fall into two classes. Configuration errors are detected
/// eagerly, before any block is touched, and mean the request could never
/// succeed against this arena. [`ArenaError::OutOfMemory`] means the
/// first-fit scan found no free block large enough right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The arena capacity cannot host a header plus a payload whose size
    /// fits the 31-bit header field.
    InvalidCapacity {
        /// Capacity that was requested, in bytes.
        capacity: usize,
        /// Smallest accepted capacity.
        min: usize,
        /// Largest accepted capacity.
        max: usize,
    },
    /// A single raw request can never fit in this arena.
    RequestTooLarge {
        /// Number of bytes requested.
        requested: usize,
        /// Largest payload the arena could ever hand out.
        max_payload: usize,
    },
    /// A type's footprint exceeds what this arena could ever hold.
    TypeTooLarge {
        /// Name of the rejected type.
        type_name: &'static str,
        /// `size_of` the rejected type.
        size: usize,
        /// Largest payload the arena could ever hand out.
        max_payload: usize,
    },
    /// No free block is large enough to satisfy the request.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
        /// Payload size of the largest free block at the time of the call.
        largest_free: usize,
    },
}

impl ArenaError {
    /// Whether this error was raised by an eager configuration check
    /// rather than by an exhausted first-fit scan.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::OutOfMemory { .. })
    }
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCapacity { capacity, min, max } => {
                write!(
                    f,
                    "invalid arena capacity {capacity} bytes: must be in {min}..={max}"
                )
            }
            Self::RequestTooLarge {
                requested,
                max_payload,
            } => {
                write!(
                    f,
                    "request of {requested} bytes can never fit: max payload {max_payload} bytes"
                )
            }
            Self::TypeTooLarge {
                type_name,
                size,
                max_payload,
            } => {
                write!(
                    f,
                    "type {type_name} ({size} bytes) can never fit: max payload {max_payload} bytes"
                )
            }
            Self::OutOfMemory {
                requested,
                largest_free,
            } => {
                write!(
                    f,
                    "out of memory: requested {requested} bytes, largest free block {largest_free} bytes"
                )
            }
        }
    }
}

impl Error for ArenaError {}

/// A broken block-layout invariant, reported by
/// [`BlockArena::check_layout`](crate::BlockArena::check_layout).
///
/// A correctly functioning arena never produces one of these; they exist
/// so tests and debugging tools can walk the headers and say precisely
/// what went wrong.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutViolation {
    /// A block's header plus payload extends past the end of the buffer.
    Overrun {
        /// Offset of the offending block's header.
        offset: usize,
        /// Payload size recorded in the header.
        size: usize,
        /// Arena capacity.
        capacity: usize,
    },
    /// Fewer than a header's worth of bytes remain after the last block.
    Truncated {
        /// Offset where the next header would have started.
        offset: usize,
        /// Arena capacity.
        capacity: usize,
    },
    /// Two physically adjacent blocks are both free.
    AdjacentFree {
        /// Offset of the first free block's header.
        first: usize,
        /// Offset of the second free block's header.
        second: usize,
    },
}

impl fmt::Display for LayoutViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overrun {
                offset,
                size,
                capacity,
            } => {
                write!(
                    f,
                    "block at {offset} with payload {size} overruns capacity {capacity}"
                )
            }
            Self::Truncated { offset, capacity } => {
                write!(
                    f,
                    "trailing {} bytes at {offset} cannot hold a header",
                    capacity - offset
                )
            }
            Self::AdjacentFree { first, second } => {
                write!(f, "adjacent free blocks at {first} and {second}")
            }
        }
    }
}

impl Error for LayoutViolation {}
