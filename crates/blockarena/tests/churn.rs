//! Integration test: long allocate/release churn.
//!
//! Replays seeded workloads and checks the layout invariants after every
//! single step, then releases whatever is left in a shuffled order and
//! expects the arena to collapse back to one free block.

use blockarena::BlockArena;
use blockarena_test_utils::fixtures::ChurnScript;
use blockarena_test_utils::{assert_fully_coalesced, assert_layout};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for i in (1..items.len()).rev() {
        let j = rng.next_u32() as usize % (i + 1);
        items.swap(i, j);
    }
}

#[test]
fn churn_preserves_invariants_and_coalesces_fully() {
    for seed in 0..16u64 {
        let script = ChurnScript::generate(seed, 2_000, 96);
        let mut arena = BlockArena::new(4096).unwrap();

        let (report, mut live) = script.run(&mut arena, assert_layout);
        assert!(report.allocations > 0, "seed {seed}: nothing allocated");

        shuffle(&mut live, seed ^ 0xA5A5);
        for h in live {
            arena.release(h);
            assert_layout(&arena);
        }
        assert_fully_coalesced(&arena);
    }
}

#[test]
fn small_arena_hits_out_of_memory_without_corruption() {
    let script = ChurnScript::generate(99, 1_000, 200);
    let mut arena = BlockArena::new(512).unwrap();
    let (report, live) = script.run(&mut arena, assert_layout);
    assert!(report.failures > 0, "expected the 512-byte arena to fill up");
    for h in live {
        arena.release(h);
    }
    assert_fully_coalesced(&arena);
}

#[test]
fn stats_stay_consistent_under_churn() {
    let script = ChurnScript::generate(5, 1_000, 64);
    let mut arena = BlockArena::new(2048).unwrap();
    let (_, live) = script.run(&mut arena, |arena| {
        let stats = arena.stats();
        assert_eq!(
            stats.used_bytes + stats.free_bytes + stats.header_bytes(),
            stats.capacity
        );
        assert!(stats.largest_free <= stats.free_bytes);
    });
    for h in live {
        arena.release(h);
    }
    let stats = arena.stats();
    assert_eq!(stats.block_count, 1);
    assert_eq!(stats.fragmentation(), 0.0);
}
