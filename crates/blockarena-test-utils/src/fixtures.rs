//! Reusable arena test fixtures.
//!
//! - [`DropCounter`] / [`Tracked`]: a payload that records its own drops.
//! - [`LevelData`]: a demo-shaped record holding a raw block handle.
//! - [`ChurnScript`]: a seeded, reproducible allocate/release workload.

use std::cell::Cell;
use std::rc::Rc;

use blockarena::{BlockArena, BlockHandle};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Shared counter of [`Tracked`] drops.
#[derive(Clone, Debug, Default)]
pub struct DropCounter(Rc<Cell<usize>>);

impl DropCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of drops recorded so far.
    pub fn get(&self) -> usize {
        self.0.get()
    }

    /// Build a tracked payload reporting to this counter.
    pub fn track(&self, id: u32) -> Tracked {
        Tracked {
            id,
            counter: self.clone(),
        }
    }
}

/// Payload that bumps its [`DropCounter`] when dropped.
#[derive(Debug)]
pub struct Tracked {
    pub id: u32,
    counter: DropCounter,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.counter.0.set(self.counter.0.get() + 1);
    }
}

/// A named record whose contents live in a separate raw block.
#[derive(Debug)]
pub struct LevelData {
    pub name: String,
    pub contents: Option<BlockHandle>,
}

impl LevelData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: None,
        }
    }
}

/// One step of a churn workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChurnOp {
    /// Allocate this many bytes.
    Alloc(usize),
    /// Release the live handle at `index % live.len()`.
    Release(usize),
}

/// Seeded allocate/release workload. The same seed always yields the same
/// operations.
#[derive(Clone, Debug)]
pub struct ChurnScript {
    pub ops: Vec<ChurnOp>,
}

/// Outcome counts of [`ChurnScript::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChurnReport {
    pub allocations: usize,
    pub failures: usize,
    pub releases: usize,
}

impl ChurnScript {
    /// Generate `len` operations with allocation sizes in `0..max_size`.
    ///
    /// Roughly three allocations for every two releases, so the arena
    /// fills up and exercises the out-of-memory path.
    pub fn generate(seed: u64, len: usize, max_size: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let ops = (0..len)
            .map(|_| {
                if rng.next_u32() % 5 < 3 {
                    ChurnOp::Alloc(rng.next_u32() as usize % max_size.max(1))
                } else {
                    ChurnOp::Release(rng.next_u32() as usize)
                }
            })
            .collect();
        Self { ops }
    }

    /// Replay the script against `arena`, calling `check` after every step.
    ///
    /// Handles still live at the end are returned so the caller can decide
    /// how to release them.
    pub fn run(
        &self,
        arena: &mut BlockArena,
        mut check: impl FnMut(&BlockArena),
    ) -> (ChurnReport, Vec<BlockHandle>) {
        let mut report = ChurnReport::default();
        let mut live = Vec::new();
        for op in &self.ops {
            match *op {
                ChurnOp::Alloc(size) => match arena.allocate(size) {
                    Ok(h) => {
                        report.allocations += 1;
                        live.push(h);
                    }
                    Err(_) => report.failures += 1,
                },
                ChurnOp::Release(index) => {
                    if !live.is_empty() {
                        let h = live.swap_remove(index % live.len());
                        arena.release(h);
                        report.releases += 1;
                    }
                }
            }
            check(&*arena);
        }
        (report, live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_counter_counts() {
        let counter = DropCounter::new();
        drop(counter.track(1));
        drop(counter.track(2));
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn same_seed_same_script() {
        let a = ChurnScript::generate(7, 100, 64);
        let b = ChurnScript::generate(7, 100, 64);
        assert_eq!(a.ops, b.ops);
    }

    #[test]
    fn script_sizes_respect_bound() {
        let script = ChurnScript::generate(3, 500, 16);
        assert!(script.ops.iter().all(|op| match op {
            ChurnOp::Alloc(size) => *size < 16,
            ChurnOp::Release(_) => true,
        }));
    }

    #[test]
    fn run_counts_operations() {
        let script = ChurnScript::generate(11, 200, 128);
        let mut arena = BlockArena::new(1024).unwrap();
        let mut steps = 0;
        let (report, live) = script.run(&mut arena, |_| steps += 1);
        assert_eq!(steps, 200);
        assert_eq!(report.allocations - report.releases, live.len());
    }
}
