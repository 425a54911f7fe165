//! Typed construction and destruction on top of raw blocks.
//!
//! A value is moved into an occupied block at an address aligned for its
//! type. The arena stores no type metadata: the [`TypedHandle`] carries the
//! type so [`BlockArena::destroy`] can run the matching destructor.

#![allow(unsafe_code)]

use std::any;
use std::mem;

use crate::arena::BlockArena;
use crate::error::ArenaError;
use crate::handle::TypedHandle;
use crate::header::HEADER_SIZE;

struct ReleaseOnUnwind<'a> {
    arena: &'a mut BlockArena,
    offset: usize,
}

impl Drop for ReleaseOnUnwind<'_> {
    fn drop(&mut self) {
        self.arena.free_block(self.offset);
    }
}

impl BlockArena {
    /// Move `value` into the arena.
    ///
    /// On failure `value` is dropped and the arena is unchanged. Use
    /// [`BlockArena::construct_with`] to avoid building a value that may not
    /// fit.
    pub fn construct<T>(&mut self, value: T) -> Result<TypedHandle<T>, ArenaError> {
        self.construct_with(|| value)
    }

    /// Allocate room for a `T`, then build it in place with `init`.
    ///
    /// `init` is not called when the allocation fails. The block is chosen
    /// first-fit among free blocks able to hold `size_of::<T>()` bytes at an
    /// `align_of::<T>()`-aligned address; for byte-aligned types this is
    /// exactly `allocate(size_of::<T>())`.
    ///
    /// Fails eagerly with [`ArenaError::TypeTooLarge`] when the type plus
    /// its alignment padding could not fit even in an empty arena. If `init`
    /// panics the block is released before the panic propagates.
    pub fn construct_with<T, F>(&mut self, init: F) -> Result<TypedHandle<T>, ArenaError>
    where
        F: FnOnce() -> T,
    {
        let size = mem::size_of::<T>();
        let align = mem::align_of::<T>();
        let max_payload = self.max_payload();
        if self.first_payload_padding(align) + size > max_payload {
            return Err(ArenaError::TypeTooLarge {
                type_name: any::type_name::<T>(),
                size,
                max_payload,
            });
        }
        let (payload, value) = self.allocate_aligned(size, align)?;

        // Hand the block back if `init` unwinds.
        let guard = ReleaseOnUnwind {
            arena: &mut *self,
            offset: payload - HEADER_SIZE,
        };
        let object = init();
        mem::forget(guard);

        // SAFETY: `allocate_aligned` just carved an occupied block whose
        // payload holds `size` bytes at `value`, aligned for `T`; nothing
        // else lives there.
        unsafe { self.buffer.write_value(value, object) };
        Ok(TypedHandle::new(self.id(), payload, value))
    }

    /// Borrow a resident value, or `None` for a handle of another arena.
    pub fn get<T>(&self, handle: &TypedHandle<T>) -> Option<&T> {
        if handle.arena != self.id() {
            return None;
        }
        // SAFETY: the handle was minted by this arena's `construct_with` and
        // is not `Clone`; `destroy` consumes it. While it exists the value is
        // live at `handle.value`.
        Some(unsafe { self.buffer.value_ref(handle.value) })
    }

    /// Mutably borrow a resident value, or `None` for a handle of another
    /// arena.
    pub fn get_mut<T>(&mut self, handle: &TypedHandle<T>) -> Option<&mut T> {
        if handle.arena != self.id() {
            return None;
        }
        // SAFETY: as for `get`; `&mut self` guarantees exclusivity.
        Some(unsafe { self.buffer.value_mut(handle.value) })
    }

    /// Drop a resident value in place and release its block.
    ///
    /// `None` is a no-op. A handle from another arena is ignored without
    /// running the destructor: its memory is not ours to touch and may
    /// already be gone.
    pub fn destroy<T>(&mut self, handle: impl Into<Option<TypedHandle<T>>>) {
        let Some(handle) = handle.into() else {
            return;
        };
        let Some(offset) = self.block_offset(handle.arena, handle.payload) else {
            return;
        };
        // SAFETY: the handle belongs to this arena (checked above) and is
        // consumed here, so the value is live and never touched again.
        unsafe { self.buffer.drop_value::<T>(handle.value) };
        self.free_block(offset);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use std::panic::{self, AssertUnwindSafe};

    use super::*;

    struct Tracked {
        drops: Rc<Cell<usize>>,
        label: String,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[test]
    fn construct_get_destroy() {
        let drops = Rc::new(Cell::new(0));
        let mut arena = BlockArena::new(512).unwrap();
        let h = arena
            .construct(Tracked {
                drops: Rc::clone(&drops),
                label: "level".into(),
            })
            .unwrap();
        assert_eq!(arena.get(&h).unwrap().label, "level");
        arena.get_mut(&h).unwrap().label.push_str("-1");
        assert_eq!(arena.get(&h).unwrap().label, "level-1");
        assert_eq!(drops.get(), 0);

        arena.destroy(h);
        assert_eq!(drops.get(), 1);
        assert!(arena.is_empty());
    }

    #[test]
    fn destroy_none_is_noop() {
        let mut arena = BlockArena::new(64).unwrap();
        arena.destroy::<u32>(None);
        assert!(arena.is_empty());
    }

    #[test]
    fn construct_with_skips_init_on_failure() {
        let mut arena = BlockArena::new(64).unwrap();
        let _fill = arena.allocate(60).unwrap();
        let mut called = false;
        let err = arena
            .construct_with(|| {
                called = true;
                0u32
            })
            .unwrap_err();
        assert!(matches!(err, ArenaError::OutOfMemory { requested: 4, .. }));
        assert!(!called);
    }

    #[test]
    fn oversized_type_is_configuration_error() {
        let mut arena = BlockArena::new(64).unwrap();
        let err = arena.construct([0u8; 61]).unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(
            err,
            ArenaError::TypeTooLarge {
                size: 61,
                max_payload: 60,
                ..
            }
        ));
    }

    #[repr(align(32))]
    struct Wide([u8; 32]);

    #[test]
    fn alignment_padding_counts_toward_type_footprint() {
        let mut arena = BlockArena::new(36).unwrap();
        assert_eq!(arena.max_payload(), 32);
        let err = arena.construct(Wide([0; 32])).unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(
            err,
            ArenaError::TypeTooLarge {
                size: 32,
                max_payload: 32,
                ..
            }
        ));
        assert!(arena.is_empty());
    }

    #[test]
    fn wide_type_fits_when_padding_allows() {
        let mut arena = BlockArena::new(128).unwrap();
        let h = arena.construct(Wide([9; 32])).unwrap();
        let addr = arena.get(&h).unwrap() as *const Wide as usize;
        assert_eq!(addr % 32, 0);
        assert_eq!(arena.get(&h).unwrap().0, [9; 32]);
        arena.destroy(h);
        assert!(arena.is_empty());
    }

    #[test]
    fn panicking_init_returns_the_block() {
        let mut arena = BlockArena::new(120).unwrap();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            arena.construct_with::<u32, _>(|| panic!("init failed"))
        }));
        assert!(result.is_err());
        assert!(arena.is_empty());
        assert!(arena.check_layout().is_ok());
    }

    #[test]
    fn panicking_init_keeps_neighbours_intact() {
        let mut arena = BlockArena::new(256).unwrap();
        let kept = arena.allocate(16).unwrap();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            arena.construct_with::<[u8; 24], _>(|| panic!("init failed"))
        }));
        assert!(result.is_err());
        let layout: Vec<_> = arena.blocks().map(|b| (b.size, b.is_free)).collect();
        assert_eq!(layout, vec![(16, false), (236, true)]);
        arena.release(kept);
        assert!(arena.is_empty());
    }

    #[test]
    fn byte_aligned_type_uses_exact_size() {
        let mut arena = BlockArena::new(256).unwrap();
        let h = arena.construct([7u8; 10]).unwrap();
        assert_eq!(h.offset(), HEADER_SIZE);
        let first = arena.blocks().next().unwrap();
        assert_eq!(first.size, 10);
        assert!(!first.is_free);
        assert_eq!(arena.get(&h), Some(&[7u8; 10]));
    }

    #[test]
    fn values_are_aligned_after_odd_sized_blocks() {
        let mut arena = BlockArena::new(512).unwrap();
        let _odd = arena.allocate(3).unwrap();
        let h = arena.construct(0x0102_0304_0506_0708u64).unwrap();
        let addr = arena.get(&h).unwrap() as *const u64 as usize;
        assert_eq!(addr % mem::align_of::<u64>(), 0);
        assert_eq!(*arena.get(&h).unwrap(), 0x0102_0304_0506_0708);
        assert!(arena.check_layout().is_ok());
    }

    #[test]
    fn foreign_typed_handle_is_ignored() {
        let drops = Rc::new(Cell::new(0));
        let mut ours = BlockArena::new(256).unwrap();
        let mut theirs = BlockArena::new(256).unwrap();
        let h = theirs
            .construct(Tracked {
                drops: Rc::clone(&drops),
                label: String::new(),
            })
            .unwrap();
        assert!(ours.get(&h).is_none());
        ours.destroy(h);
        assert_eq!(drops.get(), 0);
        assert!(ours.is_empty());
        assert_eq!(theirs.stats().block_count, 2);
    }

    #[test]
    fn dropping_arena_does_not_run_destructors() {
        let drops = Rc::new(Cell::new(0));
        let mut arena = BlockArena::new(256).unwrap();
        let h = arena
            .construct(Tracked {
                drops: Rc::clone(&drops),
                label: String::new(),
            })
            .unwrap();
        mem::forget(h);
        drop(arena);
        assert_eq!(drops.get(), 0);
    }

    #[test]
    fn zero_sized_values_round_trip() {
        let mut arena = BlockArena::new(64).unwrap();
        let h = arena.construct(()).unwrap();
        assert_eq!(arena.get(&h), Some(&()));
        arena.destroy(h);
        assert!(arena.is_empty());
    }
}
