//! Direct allocation - one heap block per object
//!
//! Baseline strategy: every object costs one reservation and one release.
//! The allocator keeps no record of what it handed out; the allocation
//! context owns the list of outstanding handles.

use super::heap::{GlobalHeap, Heap};
use super::{Strategy, StrategyKind};
use crate::errors::AllocError;
use crate::logging::log_release_fault;
use core::marker::PhantomData;
use core::ptr::NonNull;
use std::alloc::Layout;

/// Ownership token for one directly allocated block.
///
/// Deliberately neither `Clone` nor `Copy`: releasing consumes the handle,
/// so the same block cannot be released twice through safe code.
#[derive(Debug, PartialEq, Eq)]
pub struct DirectHandle {
    ptr: NonNull<u8>,
}

impl DirectHandle {
    /// Address of the block, for diagnostics.
    pub fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }
}

/// Per-object allocator backed by a [`Heap`].
pub struct DirectAllocator<H: Heap = GlobalHeap> {
    heap: H,
    layout: Layout,
    object_size: usize,
    reservations: u64,
    releases: u64,
    // Raw heap blocks are tied to the creating thread's view of the heap.
    _not_send: PhantomData<*mut u8>,
}

impl DirectAllocator<GlobalHeap> {
    pub fn new(object_size: usize) -> Result<Self, AllocError> {
        Self::with_heap(object_size, GlobalHeap)
    }
}

impl<H: Heap> DirectAllocator<H> {
    /// Build an allocator over a custom heap.
    ///
    /// Zero-sized objects still reserve one byte so every handle names a
    /// distinct live block.
    pub fn with_heap(object_size: usize, heap: H) -> Result<Self, AllocError> {
        let layout = Layout::from_size_align(object_size.max(1), 1)
            .map_err(|_| AllocError::OutOfMemory { size: object_size })?;

        Ok(Self {
            heap,
            layout,
            object_size,
            reservations: 0,
            releases: 0,
            _not_send: PhantomData,
        })
    }

    /// Reserve one fresh block.
    #[inline]
    pub fn allocate(&mut self) -> Result<(DirectHandle, &mut [u8]), AllocError> {
        let ptr = self
            .heap
            .reserve(self.layout)
            .ok_or(AllocError::OutOfMemory { size: self.layout.size() })?;
        self.reservations += 1;

        // `Heap` implementors guarantee a zeroed block valid for `layout`,
        // and the slice borrows `self` so it cannot outlive a reclaim.
        let bytes = unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), self.object_size) };
        Ok((DirectHandle { ptr }, bytes))
    }

    /// Give one block back to the heap.
    ///
    /// A heap fault is reported as `ReclaimFailed { slot: 0 }`; bulk
    /// reclamation replaces the slot with the tracking index.
    ///
    /// # Safety
    ///
    /// `handle` must have been produced by `allocate` on this allocator.
    #[inline]
    pub unsafe fn release(&mut self, handle: DirectHandle) -> Result<(), AllocError> {
        let address = handle.address();
        match self.heap.release(handle.ptr, self.layout) {
            Ok(()) => {
                self.releases += 1;
                Ok(())
            }
            Err(fault) => {
                log_release_fault(address, &fault);
                Err(AllocError::ReclaimFailed { slot: 0 })
            }
        }
    }

    pub fn heap(&self) -> &H {
        &self.heap
    }
}

impl<H: Heap> Strategy for DirectAllocator<H> {
    type Handle = DirectHandle;

    const KIND: StrategyKind = StrategyKind::Direct;

    #[inline]
    fn allocate(&mut self) -> Result<(DirectHandle, &mut [u8]), AllocError> {
        DirectAllocator::allocate(self)
    }

    unsafe fn reclaim(&mut self, outstanding: &mut [Option<DirectHandle>]) -> Result<(), AllocError> {
        for (slot, entry) in outstanding.iter_mut().enumerate() {
            if let Some(handle) = entry.take() {
                self.release(handle)
                    .map_err(|_| AllocError::ReclaimFailed { slot })?;
            }
        }
        Ok(())
    }

    fn object_size(&self) -> usize {
        self.object_size
    }

    fn reservations(&self) -> u64 {
        self.reservations
    }

    fn releases(&self) -> u64 {
        self.releases
    }
}
