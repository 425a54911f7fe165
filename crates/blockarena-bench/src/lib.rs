//! Benchmark workloads for blockarena.
//!
//! Provides pre-built arena states for benchmarking:
//!
//! - [`packed_arena`]: arena filled with equal-sized occupied blocks
//! - [`holey_arena`]: packed arena with every other block released, so
//!   first-fit and the previous-block scan both walk many headers

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use blockarena::{BlockArena, BlockHandle};

/// Fill a fresh arena with as many `block_size` allocations as fit.
///
/// Returns the arena and the live handles in address order.
pub fn packed_arena(capacity: usize, block_size: usize) -> (BlockArena, Vec<BlockHandle>) {
    let mut arena = BlockArena::new(capacity).expect("benchmark capacity is valid");
    let mut handles = Vec::new();
    while let Ok(h) = arena.allocate(block_size) {
        handles.push(h);
    }
    (arena, handles)
}

/// A packed arena with every other block released.
///
/// Returns the arena and the handles that are still live.
pub fn holey_arena(capacity: usize, block_size: usize) -> (BlockArena, Vec<BlockHandle>) {
    let (mut arena, handles) = packed_arena(capacity, block_size);
    let mut live = Vec::with_capacity(handles.len() / 2 + 1);
    for (i, h) in handles.into_iter().enumerate() {
        if i % 2 == 0 {
            arena.release(h);
        } else {
            live.push(h);
        }
    }
    (arena, live)
}
