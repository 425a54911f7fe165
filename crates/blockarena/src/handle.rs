//! Arena identities and allocation handles.
//!
//! Handles record the [`ArenaId`] of the arena that minted them, so a handle
//! can never be resolved against a different arena's buffer. Neither handle
//! type is `Clone`: releasing or destroying consumes the handle, which makes
//! a double release unrepresentable.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`ArenaId`] allocation.
static ARENA_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a [`BlockArena`](crate::BlockArena).
///
/// Allocated from a monotonic atomic counter, so ids are never reused
/// within a process even after an arena is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(u64);

impl ArenaId {
    /// Allocate a fresh, unique id.
    pub(crate) fn next() -> Self {
        Self(ARENA_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ArenaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a raw block returned by
/// [`BlockArena::allocate`](crate::BlockArena::allocate).
///
/// Resolve it with [`BlockArena::bytes`](crate::BlockArena::bytes) and
/// hand it back with [`BlockArena::release`](crate::BlockArena::release).
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a BlockHandle leaks its block until the arena is dropped"]
pub struct BlockHandle {
    pub(crate) arena: ArenaId,
    /// Byte offset of the payload within the arena buffer.
    pub(crate) offset: usize,
    /// Number of bytes requested.
    pub(crate) len: usize,
}

impl BlockHandle {
    pub(crate) fn new(arena: ArenaId, offset: usize, len: usize) -> Self {
        Self { arena, offset, len }
    }

    /// The arena that minted this handle.
    pub fn arena_id(&self) -> ArenaId {
        self.arena
    }

    /// Byte offset of the payload within the arena buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of bytes requested.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this is a zero-length allocation.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockHandle(arena={}, off={}, len={})",
            self.arena, self.offset, self.len
        )
    }
}

/// Handle to a `T` resident in an arena, returned by
/// [`BlockArena::construct`](crate::BlockArena::construct).
///
/// The type parameter is what lets
/// [`BlockArena::destroy`](crate::BlockArena::destroy) run the right
/// destructor; the buffer itself stores no type information.
#[must_use = "dropping a TypedHandle leaks its value until the arena is dropped"]
pub struct TypedHandle<T> {
    pub(crate) arena: ArenaId,
    /// Byte offset of the block payload.
    pub(crate) payload: usize,
    /// Byte offset of the value, after alignment padding.
    pub(crate) value: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedHandle<T> {
    pub(crate) fn new(arena: ArenaId, payload: usize, value: usize) -> Self {
        Self {
            arena,
            payload,
            value,
            _marker: PhantomData,
        }
    }

    /// The arena that minted this handle.
    pub fn arena_id(&self) -> ArenaId {
        self.arena
    }

    /// Byte offset of the value within the arena buffer.
    pub fn offset(&self) -> usize {
        self.value
    }
}

impl<T> fmt::Debug for TypedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedHandle")
            .field("type", &std::any::type_name::<T>())
            .field("arena", &self.arena)
            .field("payload", &self.payload)
            .field("value", &self.value)
            .finish()
    }
}

impl<T> PartialEq for TypedHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.arena == other.arena && self.payload == other.payload && self.value == other.value
    }
}

impl<T> Eq for TypedHandle<T> {}
