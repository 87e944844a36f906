//! Heap backend for direct allocation
//!
//! Direct allocation goes through this seam rather than calling the global
//! allocator inline so a run can be pointed at an instrumented heap.

use crate::errors::HeapFault;
use core::ptr::NonNull;
use std::alloc::{alloc_zeroed, dealloc, Layout};

/// General-purpose allocator used for one-block-per-object allocation.
///
/// # Safety
///
/// A pointer returned by [`Heap::reserve`] must be valid for reads and
/// writes of `layout.size()` bytes, aligned to `layout.align()`, zeroed, and
/// must stay valid and unaliased until it is passed back to
/// [`Heap::release`]. [`DirectAllocator`](crate::allocator::DirectAllocator)
/// builds object slices from these pointers in safe code.
///
/// Implementing the trait therefore requires `unsafe impl`:
///
/// ```compile_fail
/// use std::alloc::Layout;
/// use std::ptr::NonNull;
/// use tlab_bench::{Heap, HeapFault};
///
/// struct DanglingHeap;
///
/// impl Heap for DanglingHeap {
///     fn reserve(&mut self, _layout: Layout) -> Option<NonNull<u8>> {
///         Some(NonNull::dangling())
///     }
///
///     unsafe fn release(&mut self, _ptr: NonNull<u8>, _layout: Layout) -> Result<(), HeapFault> {
///         Ok(())
///     }
/// }
/// ```
pub unsafe trait Heap {
    /// Reserve a zeroed block for `layout`. Returns `None` when exhausted.
    ///
    /// `layout` always has a non-zero size.
    fn reserve(&mut self, layout: Layout) -> Option<NonNull<u8>>;

    /// Release a block previously returned by [`Heap::reserve`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `reserve` on this heap with the same `layout`
    /// and must not have been released already.
    unsafe fn release(&mut self, ptr: NonNull<u8>, layout: Layout) -> Result<(), HeapFault>;
}

/// The process-wide Rust allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalHeap;

// `alloc_zeroed` upholds the reservation contract until `dealloc`.
unsafe impl Heap for GlobalHeap {
    #[inline]
    fn reserve(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() > 0, "zero-sized heap reservation");
        NonNull::new(unsafe { alloc_zeroed(layout) })
    }

    #[inline]
    unsafe fn release(&mut self, ptr: NonNull<u8>, layout: Layout) -> Result<(), HeapFault> {
        dealloc(ptr.as_ptr(), layout);
        Ok(())
    }
}
