//! Test utilities for blockarena development.
//!
//! Provides a layout invariant checker ([`assert_layout`]), compact layout
//! snapshots ([`layout_of`]), drop-observing payload types and a seeded
//! churn workload in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use blockarena::{BlockArena, HEADER_SIZE};

/// Compact `(payload size, is_free)` view of every block in address order.
pub fn layout_of(arena: &BlockArena) -> Vec<(usize, bool)> {
    arena.blocks().map(|b| (b.size, b.is_free)).collect()
}

/// Panic with a descriptive message if any layout invariant is broken.
///
/// Checks that block spans sum to the capacity, that the header walk tiles
/// the buffer exactly, and that no two adjacent blocks are both free.
pub fn assert_layout(arena: &BlockArena) {
    if let Err(violation) = arena.check_layout() {
        panic!(
            "layout violation: {violation}\nblocks: {:?}",
            layout_of(arena)
        );
    }
    let total: usize = arena.blocks().map(|b| HEADER_SIZE + b.size).sum();
    assert_eq!(
        total,
        arena.capacity(),
        "block spans do not sum to capacity: {:?}",
        layout_of(arena)
    );
}

/// Panic unless the arena is back to a single free block.
pub fn assert_fully_coalesced(arena: &BlockArena) {
    assert!(
        arena.is_empty(),
        "arena not fully coalesced: {:?}",
        layout_of(arena)
    );
}
