//! Read-only views of the block sequence.
//!
//! [`Blocks`] walks the headers in address order. [`ArenaStats`] folds that
//! walk into occupancy and fragmentation figures.

use std::fmt;

use crate::header::HEADER_SIZE;
use crate::raw::RawBuffer;

/// One block as seen by a header walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Byte offset of the block's header.
    pub offset: usize,
    /// Payload size in bytes.
    pub size: usize,
    /// Whether the block is free.
    pub is_free: bool,
}

impl BlockInfo {
    /// Byte offset of the payload.
    pub fn payload_offset(&self) -> usize {
        self.offset + HEADER_SIZE
    }

    /// Header plus payload.
    pub fn span(&self) -> usize {
        HEADER_SIZE + self.size
    }

    /// Offset of the physically next block (or the buffer end).
    pub fn next_offset(&self) -> usize {
        self.offset + self.span()
    }
}

/// Iterator over the arena's blocks in address order.
///
/// Created by [`BlockArena::blocks`](crate::BlockArena::blocks). Stops at the
/// buffer end, or right after a block whose span runs past it.
pub struct Blocks<'a> {
    buffer: &'a RawBuffer,
    offset: usize,
}

impl<'a> Blocks<'a> {
    pub(crate) fn new(buffer: &'a RawBuffer) -> Self {
        Self { buffer, offset: 0 }
    }
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        if self.offset + HEADER_SIZE > self.buffer.len() {
            return None;
        }
        let header = self.buffer.read_header(self.offset);
        let info = BlockInfo {
            offset: self.offset,
            size: header.size(),
            is_free: header.is_free(),
        };
        self.offset = info.next_offset();
        Some(info)
    }
}

/// Occupancy snapshot of an arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Buffer size in bytes.
    pub capacity: usize,
    /// Number of blocks, free and occupied.
    pub block_count: usize,
    /// Number of free blocks.
    pub free_blocks: usize,
    /// Sum of free payload sizes.
    pub free_bytes: usize,
    /// Sum of occupied payload sizes.
    pub used_bytes: usize,
    /// Payload size of the largest free block, 0 if none.
    pub largest_free: usize,
}

impl ArenaStats {
    pub(crate) fn collect(capacity: usize, blocks: Blocks<'_>) -> Self {
        blocks.fold(
            Self {
                capacity,
                ..Self::default()
            },
            |mut stats, block| {
                stats.block_count += 1;
                if block.is_free {
                    stats.free_blocks += 1;
                    stats.free_bytes += block.size;
                    stats.largest_free = stats.largest_free.max(block.size);
                } else {
                    stats.used_bytes += block.size;
                }
                stats
            },
        )
    }

    /// Bytes spent on headers.
    pub fn header_bytes(&self) -> usize {
        self.block_count * HEADER_SIZE
    }

    /// Share of free payload not in the largest free block, in `[0, 1]`.
    ///
    /// 0 means all free space is contiguous.
    pub fn fragmentation(&self) -> f64 {
        if self.free_bytes == 0 {
            return 0.0;
        }
        1.0 - self.largest_free as f64 / self.free_bytes as f64
    }
}

impl fmt::Display for ArenaStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} blocks ({} free), {} used / {} free of {} bytes, largest free {}",
            self.block_count,
            self.free_blocks,
            self.used_bytes,
            self.free_bytes,
            self.capacity,
            self.largest_free
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::BlockHeader;

    fn two_block_buffer() -> RawBuffer {
        let mut buf = RawBuffer::zeroed(64).unwrap();
        buf.write_header(0, BlockHeader::occupied(20));
        buf.write_header(24, BlockHeader::free(36));
        buf
    }

    #[test]
    fn walk_visits_blocks_in_order() {
        let buf = two_block_buffer();
        let blocks: Vec<_> = Blocks::new(&buf).collect();
        assert_eq!(
            blocks,
            vec![
                BlockInfo {
                    offset: 0,
                    size: 20,
                    is_free: false
                },
                BlockInfo {
                    offset: 24,
                    size: 36,
                    is_free: true
                },
            ]
        );
        assert_eq!(blocks[1].payload_offset(), 28);
        assert_eq!(blocks[1].next_offset(), 64);
    }

    #[test]
    fn stats_fold() {
        let buf = two_block_buffer();
        let stats = ArenaStats::collect(64, Blocks::new(&buf));
        assert_eq!(stats.block_count, 2);
        assert_eq!(stats.free_blocks, 1);
        assert_eq!(stats.used_bytes, 20);
        assert_eq!(stats.free_bytes, 36);
        assert_eq!(stats.largest_free, 36);
        assert_eq!(stats.header_bytes(), 8);
        assert_eq!(
            stats.used_bytes + stats.free_bytes + stats.header_bytes(),
            stats.capacity
        );
        assert_eq!(stats.fragmentation(), 0.0);
    }

    #[test]
    fn fragmentation_reflects_split_free_space() {
        let stats = ArenaStats {
            capacity: 100,
            block_count: 3,
            free_blocks: 2,
            free_bytes: 40,
            used_bytes: 48,
            largest_free: 30,
        };
        assert!((stats.fragmentation() - 0.25).abs() < 1e-12);
    }
}
