//! The first-fit block arena.
//!
//! [`BlockArena`] manages one fixed-size buffer as a sequence of physically
//! contiguous blocks, each prefixed by a [`BlockHeader`]. There is no
//! side table: the free list is the header chain itself.
//!
//! - **Allocate:** scan from offset 0 for the first free block large
//!   enough, mark it occupied and split off the remainder as a new free
//!   block when the remainder can hold more than a header's worth of
//!   payload. Smaller remainders are absorbed into the occupied block.
//! - **Release:** mark the block free, merge the following block if it is
//!   free, then merge into the preceding block if that is free. Headers
//!   carry no back-pointer, so the preceding block is found by a forward
//!   scan from the start: O(blocks) per release.

use tracing::{debug, trace};

use crate::config::{ArenaConfig, InvalidHandlePolicy};
use crate::error::{ArenaError, LayoutViolation};
use crate::handle::{ArenaId, BlockHandle};
use crate::header::{BlockHeader, HEADER_SIZE};
use crate::layout::{ArenaStats, Blocks};
use crate::raw::RawBuffer;

/// A fixed-capacity arena serving variable-sized allocations.
///
/// Not `Send` or `Sync`: callers sharing an arena across threads must wrap
/// the whole arena in their own lock. Dropping the arena frees the buffer
/// without running destructors of values still resident in it; use
/// [`BlockArena::destroy`] first for types whose teardown matters.
pub struct BlockArena {
    id: ArenaId,
    config: ArenaConfig,
    pub(crate) buffer: RawBuffer,
}

impl BlockArena {
    /// Create an arena with the given capacity and default policies.
    pub fn new(capacity: usize) -> Result<Self, ArenaError> {
        Self::with_config(ArenaConfig::new(capacity))
    }

    /// Create an arena from a validated config.
    ///
    /// The arena starts as one free block spanning the whole buffer.
    pub fn with_config(config: ArenaConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let mut buffer =
            RawBuffer::zeroed(config.capacity).ok_or(ArenaError::InvalidCapacity {
                capacity: config.capacity,
                min: ArenaConfig::MIN_CAPACITY,
                max: ArenaConfig::MAX_CAPACITY,
            })?;
        buffer.write_header(0, BlockHeader::free(config.max_payload()));
        let id = ArenaId::next();
        debug!(arena = %id, capacity = config.capacity, "created block arena");
        Ok(Self { id, config, buffer })
    }

    /// This arena's unique id.
    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// Total buffer size in bytes, headers included.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// The configuration this arena was built from.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Largest payload a single block can ever have in this arena.
    pub fn max_payload(&self) -> usize {
        self.config.max_payload()
    }

    /// Allocate `size` zeroed bytes.
    ///
    /// Fails eagerly with [`ArenaError::RequestTooLarge`] when `size` exceeds
    /// [`BlockArena::max_payload`], and with [`ArenaError::OutOfMemory`] when
    /// no free block is large enough. A failed call leaves the arena
    /// unchanged.
    pub fn allocate(&mut self, size: usize) -> Result<BlockHandle, ArenaError> {
        let max_payload = self.max_payload();
        if size > max_payload {
            return Err(ArenaError::RequestTooLarge {
                requested: size,
                max_payload,
            });
        }
        let (payload, _) = self.allocate_aligned(size, 1)?;
        self.buffer.zero(payload, size);
        Ok(BlockHandle::new(self.id, payload, size))
    }

    /// Return a block to the arena.
    ///
    /// `None` is a no-op. So is a handle minted by another arena; see
    /// [`InvalidHandlePolicy`] for the debug-build alternative.
    pub fn release(&mut self, handle: impl Into<Option<BlockHandle>>) {
        let Some(handle) = handle.into() else {
            return;
        };
        if let Some(offset) = self.block_offset(handle.arena, handle.offset) {
            self.free_block(offset);
        }
    }

    /// The requested bytes of a raw block, or `None` for a foreign handle.
    pub fn bytes(&self, handle: &BlockHandle) -> Option<&[u8]> {
        if handle.arena != self.id {
            return None;
        }
        Some(self.buffer.bytes(handle.offset, handle.len))
    }

    /// Mutable access to the requested bytes of a raw block.
    pub fn bytes_mut(&mut self, handle: &BlockHandle) -> Option<&mut [u8]> {
        if handle.arena != self.id {
            return None;
        }
        Some(self.buffer.bytes_mut(handle.offset, handle.len))
    }

    /// Walk the blocks in address order.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks::new(&self.buffer)
    }

    /// Occupancy and fragmentation figures.
    pub fn stats(&self) -> ArenaStats {
        ArenaStats::collect(self.capacity(), self.blocks())
    }

    /// Whether the arena is a single free block spanning the whole buffer.
    pub fn is_empty(&self) -> bool {
        let header = self.buffer.read_header(0);
        header.is_free() && header.size() == self.max_payload()
    }

    /// Walk the headers and verify the layout invariants: blocks tile the
    /// buffer exactly and no two adjacent blocks are both free.
    pub fn check_layout(&self) -> Result<(), LayoutViolation> {
        let capacity = self.capacity();
        let mut offset = 0;
        let mut prev_free: Option<usize> = None;
        while offset < capacity {
            if offset + HEADER_SIZE > capacity {
                return Err(LayoutViolation::Truncated { offset, capacity });
            }
            let header = self.buffer.read_header(offset);
            let next = offset + header.span();
            if next > capacity {
                return Err(LayoutViolation::Overrun {
                    offset,
                    size: header.size(),
                    capacity,
                });
            }
            if header.is_free() {
                if let Some(first) = prev_free {
                    return Err(LayoutViolation::AdjacentFree {
                        first,
                        second: offset,
                    });
                }
                prev_free = Some(offset);
            } else {
                prev_free = None;
            }
            offset = next;
        }
        Ok(())
    }

    /// First-fit allocation of `size` bytes placed at an `align`-aligned
    /// address within the chosen block's payload.
    ///
    /// Returns `(payload_offset, value_offset)`.
    pub(crate) fn allocate_aligned(
        &mut self,
        size: usize,
        align: usize,
    ) -> Result<(usize, usize), ArenaError> {
        let Some((offset, padding)) = self.find_fit(size, align) else {
            let largest_free = self.stats().largest_free;
            debug!(
                arena = %self.id,
                requested = size,
                largest_free,
                "no free block large enough"
            );
            return Err(ArenaError::OutOfMemory {
                requested: size,
                largest_free,
            });
        };
        self.carve(offset, padding + size);
        let payload = offset + HEADER_SIZE;
        trace!(arena = %self.id, offset, size, padding, "allocated block");
        Ok((payload, payload + padding))
    }

    /// Translate a handle's payload offset into its block offset, or `None`
    /// if the handle does not belong to this arena.
    pub(crate) fn block_offset(&self, arena: ArenaId, payload: usize) -> Option<usize> {
        let in_bounds = (HEADER_SIZE..=self.capacity()).contains(&payload);
        if arena != self.id || !in_bounds {
            debug!(
                arena = %self.id,
                handle_arena = %arena,
                payload,
                "ignoring handle that does not belong to this arena"
            );
            debug_assert!(
                self.config.invalid_handles != InvalidHandlePolicy::Assert,
                "handle (arena {arena}, offset {payload}) does not belong to arena {}",
                self.id
            );
            return None;
        }
        Some(payload - HEADER_SIZE)
    }

    /// Padding needed to align the first block's payload to `align`.
    ///
    /// A later block never needs less padding plus offset than this, so
    /// `padding + size > max_payload` means no block can ever fit.
    pub(crate) fn first_payload_padding(&self, align: usize) -> usize {
        let addr = self.buffer.base_addr() + HEADER_SIZE;
        addr.next_multiple_of(align) - addr
    }

    fn find_fit(&self, size: usize, align: usize) -> Option<(usize, usize)> {
        let capacity = self.capacity();
        let base = self.buffer.base_addr();
        let mut offset = 0;
        while offset < capacity {
            let header = self.buffer.read_header(offset);
            if header.is_free() {
                let addr = base + offset + HEADER_SIZE;
                let padding = addr.next_multiple_of(align) - addr;
                if header.size() >= padding + size {
                    return Some((offset, padding));
                }
            }
            offset += header.span();
        }
        None
    }

    /// Mark the free block at `offset` occupied with a payload of at least
    /// `request` bytes, splitting off the tail when it can host a free block
    /// with more than `HEADER_SIZE` bytes of payload.
    fn carve(&mut self, offset: usize, request: usize) {
        let old = self.buffer.read_header(offset).size();
        debug_assert!(old >= request);
        let rest = old - request;
        if rest > 2 * HEADER_SIZE {
            self.buffer
                .write_header(offset, BlockHeader::occupied(request));
            self.buffer.write_header(
                offset + HEADER_SIZE + request,
                BlockHeader::free(rest - HEADER_SIZE),
            );
        } else {
            self.buffer.write_header(offset, BlockHeader::occupied(old));
        }
    }

    /// Mark the block at `offset` free and coalesce with its neighbours.
    pub(crate) fn free_block(&mut self, offset: usize) {
        let header = self.buffer.read_header(offset);
        debug_assert!(!header.is_free(), "block at {offset} released twice");
        let mut size = header.size();

        let next = offset + header.span();
        if next < self.capacity() {
            let next_header = self.buffer.read_header(next);
            if next_header.is_free() {
                size += next_header.span();
            }
        }

        match self.previous_block(offset) {
            Some(prev) if self.buffer.read_header(prev).is_free() => {
                let merged = self.buffer.read_header(prev).size() + HEADER_SIZE + size;
                self.buffer.write_header(prev, BlockHeader::free(merged));
                trace!(arena = %self.id, offset = prev, size = merged, "released block");
            }
            _ => {
                self.buffer.write_header(offset, BlockHeader::free(size));
                trace!(arena = %self.id, offset, size, "released block");
            }
        }
    }

    /// Find the block physically preceding `offset` by scanning forward
    /// from the start of the buffer.
    fn previous_block(&self, offset: usize) -> Option<usize> {
        let mut cursor = 0;
        while cursor < offset {
            let next = cursor + self.buffer.read_header(cursor).span();
            if next == offset {
                return Some(cursor);
            }
            cursor = next;
        }
        None
    }
}
