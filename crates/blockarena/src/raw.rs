//! Low-level primitives for arena memory operations.
//!
//! [`RawBuffer`] owns the arena's single heap allocation and is the only
//! place that touches it through raw pointers. Safe accessors bounds-check
//! with `assert!`; the typed accessors are `unsafe fn` because their
//! soundness depends on the block layout, which only the arena knows.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::mem;
use std::ptr::{self, NonNull};

use crate::header::{BlockHeader, HEADER_SIZE};

/// Alignment of the buffer base address.
pub(crate) const BUFFER_ALIGN: usize = 16;

/// A fixed-size, zero-initialised byte buffer.
///
/// Holding a `NonNull<u8>` makes this type `!Send` and `!Sync`, which the
/// arena relies on: resident values of arbitrary type live in here.
pub(crate) struct RawBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl RawBuffer {
    /// Allocate `len` zeroed bytes. Returns `None` if `len` is zero or too
    /// large for a `Layout`.
    pub(crate) fn zeroed(len: usize) -> Option<Self> {
        if len == 0 {
            return None;
        }
        let layout = Layout::from_size_align(len, BUFFER_ALIGN).ok()?;
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).unwrap_or_else(|| alloc::handle_alloc_error(layout));
        Some(Self { ptr, layout })
    }

    /// Length of the buffer in bytes.
    pub(crate) fn len(&self) -> usize {
        self.layout.size()
    }

    /// Address of the first byte, for alignment arithmetic.
    pub(crate) fn base_addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    fn check_range(&self, offset: usize, len: usize) {
        let end = offset.checked_add(len);
        assert!(
            end.is_some_and(|end| end <= self.len()),
            "range {offset}+{len} outside buffer of {} bytes",
            self.len()
        );
    }

    pub(crate) fn read_header(&self, offset: usize) -> BlockHeader {
        self.check_range(offset, HEADER_SIZE);
        // SAFETY: range checked above; headers are only read at offsets the
        // arena previously wrote with `write_header`, so the bytes are
        // initialised. `read_unaligned` imposes no alignment requirement.
        let bytes =
            unsafe { ptr::read_unaligned(self.ptr.as_ptr().add(offset) as *const [u8; HEADER_SIZE]) };
        BlockHeader::from_bytes(bytes)
    }

    pub(crate) fn write_header(&mut self, offset: usize, header: BlockHeader) {
        self.check_range(offset, HEADER_SIZE);
        // SAFETY: range checked above; `write_unaligned` imposes no
        // alignment requirement.
        unsafe {
            ptr::write_unaligned(
                self.ptr.as_ptr().add(offset) as *mut [u8; HEADER_SIZE],
                header.to_bytes(),
            );
        }
    }

    /// Overwrite `len` bytes at `offset` with zeroes.
    pub(crate) fn zero(&mut self, offset: usize, len: usize) {
        self.check_range(offset, len);
        // SAFETY: range checked above.
        unsafe { ptr::write_bytes(self.ptr.as_ptr().add(offset), 0, len) };
    }

    /// Shared view of a byte range.
    ///
    /// Only called for raw-block payloads, which are zeroed on allocation
    /// and never overlap a resident typed value.
    pub(crate) fn bytes(&self, offset: usize, len: usize) -> &[u8] {
        self.check_range(offset, len);
        // SAFETY: range checked above; the bytes are initialised (zeroed at
        // allocation) and `&self` prevents concurrent mutation.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().add(offset), len) }
    }

    /// Mutable view of a byte range. Same contract as [`RawBuffer::bytes`].
    pub(crate) fn bytes_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        self.check_range(offset, len);
        // SAFETY: as for `bytes`, with `&mut self` guaranteeing exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().add(offset), len) }
    }

    fn value_ptr<T>(&self, offset: usize) -> *mut T {
        self.check_range(offset, mem::size_of::<T>());
        // SAFETY: range checked above, so the pointer stays in bounds.
        let ptr = unsafe { self.ptr.as_ptr().add(offset) };
        assert!(
            (ptr as usize) % mem::align_of::<T>() == 0,
            "offset {offset} misaligned for {}",
            std::any::type_name::<T>()
        );
        ptr.cast::<T>()
    }

    /// Move `value` into the buffer at `offset`.
    ///
    /// # Safety
    ///
    /// The `size_of::<T>()` bytes at `offset` must belong to an occupied
    /// block and must not hold any other live value.
    pub(crate) unsafe fn write_value<T>(&mut self, offset: usize, value: T) {
        let ptr = self.value_ptr::<T>(offset);
        // SAFETY: in bounds and aligned (checked by `value_ptr`); caller
        // guarantees the region is not otherwise in use.
        unsafe { ptr.write(value) };
    }

    /// Borrow the value at `offset`.
    ///
    /// # Safety
    ///
    /// A live `T` must have been written at `offset` by
    /// [`RawBuffer::write_value`] and not yet dropped.
    pub(crate) unsafe fn value_ref<T>(&self, offset: usize) -> &T {
        let ptr = self.value_ptr::<T>(offset);
        // SAFETY: caller guarantees a live, initialised `T`.
        unsafe { &*ptr }
    }

    /// Mutably borrow the value at `offset`.
    ///
    /// # Safety
    ///
    /// Same as [`RawBuffer::value_ref`].
    pub(crate) unsafe fn value_mut<T>(&mut self, offset: usize) -> &mut T {
        let ptr = self.value_ptr::<T>(offset);
        // SAFETY: caller guarantees a live `T`; `&mut self` guarantees
        // exclusivity.
        unsafe { &mut *ptr }
    }

    /// Run `T`'s destructor in place.
    ///
    /// # Safety
    ///
    /// Same as [`RawBuffer::value_ref`]; the value must not be used again.
    pub(crate) unsafe fn drop_value<T>(&mut self, offset: usize) {
        let ptr = self.value_ptr::<T>(offset);
        // SAFETY: caller guarantees a live `T` that is never touched again.
        unsafe { ptr::drop_in_place(ptr) };
    }
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        // SAFETY: `ptr` was returned by `alloc_zeroed` with this exact layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}
