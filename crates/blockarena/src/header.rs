//! In-buffer block header encoding.
//!
//! Every block is prefixed by one little-endian `u32`. Bit 31 is the free
//! flag and the low 31 bits hold the payload size in bytes, so no payload
//! can reach 2^31 bytes.

use crate::error::ArenaError;

/// Size in bytes of the header prefixing every block.
pub const HEADER_SIZE: usize = std::mem::size_of::<u32>();

/// Largest payload size a header can record.
pub const MAX_BLOCK_SIZE: usize = (1 << 31) - 1;

const FREE_BIT: u32 = 1 << 31;
const SIZE_MASK: u32 = !FREE_BIT;

/// Free flag and payload size packed into a single header word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader(u32);

impl BlockHeader {
    /// Build a header, rejecting sizes the 31-bit field cannot represent.
    pub fn new(size: usize, is_free: bool) -> Result<Self, ArenaError> {
        if size > MAX_BLOCK_SIZE {
            return Err(ArenaError::RequestTooLarge {
                requested: size,
                max_payload: MAX_BLOCK_SIZE,
            });
        }
        Ok(Self::from_parts(size, is_free))
    }

    /// Build a header from a size already known to fit.
    ///
    /// Arena-internal sizes are bounded by the capacity check done at
    /// construction, so this never truncates.
    pub(crate) fn from_parts(size: usize, is_free: bool) -> Self {
        debug_assert!(size <= MAX_BLOCK_SIZE, "block size {size} exceeds 31 bits");
        let flag = if is_free { FREE_BIT } else { 0 };
        Self(flag | (size as u32 & SIZE_MASK))
    }

    /// A free header with the given payload size.
    pub(crate) fn free(size: usize) -> Self {
        Self::from_parts(size, true)
    }

    /// An occupied header with the given payload size.
    pub(crate) fn occupied(size: usize) -> Self {
        Self::from_parts(size, false)
    }

    /// Payload size in bytes.
    pub fn size(self) -> usize {
        (self.0 & SIZE_MASK) as usize
    }

    /// Whether the block is free.
    pub fn is_free(self) -> bool {
        self.0 & FREE_BIT != 0
    }

    /// Total footprint of the block: header plus payload.
    pub fn span(self) -> usize {
        HEADER_SIZE + self.size()
    }

    /// Encode to the on-buffer byte representation.
    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        self.0.to_le_bytes()
    }

    /// Decode from the on-buffer byte representation.
    pub fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }
}
