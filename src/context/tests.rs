//! Allocation context tests
//!
//! Organised by behaviour:
//! - Construction and initial state
//! - Threshold trigger and cycle accounting
//! - Arena-specific reservation batching
//! - Direct-specific release accounting
//! - Failure propagation and the faulted state

use super::*;
use crate::allocator::{Arena, DirectAllocator, GlobalHeap, Heap};
use crate::errors::HeapFault;
use core::ptr::NonNull;
use std::alloc::Layout;
use std::cell::Cell;
use std::rc::Rc;

/// Heap that counts calls and can be told to refuse one release.
#[derive(Clone, Default)]
struct CountingHeap {
    reserved: Rc<Cell<u64>>,
    released: Rc<Cell<u64>>,
    /// 1-based index of the release call that should fail.
    fail_release: Option<u64>,
    release_calls: Rc<Cell<u64>>,
}

unsafe impl Heap for CountingHeap {
    fn reserve(&mut self, layout: Layout) -> Option<NonNull<u8>> {
        self.reserved.set(self.reserved.get() + 1);
        GlobalHeap.reserve(layout)
    }

    unsafe fn release(&mut self, ptr: NonNull<u8>, layout: Layout) -> Result<(), HeapFault> {
        let call = self.release_calls.get() + 1;
        self.release_calls.set(call);
        GlobalHeap.release(ptr, layout)?;
        if self.fail_release == Some(call) {
            return Err(HeapFault { address: ptr.as_ptr() as usize });
        }
        self.released.set(self.released.get() + 1);
        Ok(())
    }
}

fn arena_context(object_size: usize, interval: usize, capacity: usize) -> AllocationContext<Arena> {
    AllocationContext::new(Arena::new(capacity, object_size), interval).expect("context")
}

fn counting_context(interval: usize, heap: CountingHeap) -> AllocationContext<DirectAllocator<CountingHeap>> {
    let direct = DirectAllocator::with_heap(10, heap).expect("direct allocator");
    AllocationContext::new(direct, interval).expect("context")
}

// ===== Construction =====

#[test]
fn zero_interval_is_rejected() {
    let result = AllocationContext::new(Arena::new(100, 10), 0);
    assert_eq!(result.err(), Some(ConfigError::ZeroReclaimInterval));
}

#[test]
fn new_context_is_empty_and_unreserved() {
    let ctx = arena_context(10, 10, 100);
    assert_eq!(ctx.state(), ContextState::Empty);
    assert_eq!(ctx.alloc_count(), 0);
    assert_eq!(ctx.reclaim_interval(), 10);
    assert_eq!(ctx.stats(), ContextStats::default());
    assert!(!ctx.strategy().is_reserved());
    assert_eq!(ctx.kind(), StrategyKind::Arena);
}

// ===== Threshold trigger =====

#[test]
fn full_cycle_is_not_reclaimed_until_next_request() {
    let mut ctx = arena_context(10, 10, 100);
    for _ in 0..10 {
        ctx.request_object().expect("request");
    }

    assert_eq!(ctx.alloc_count(), 10);
    assert_eq!(ctx.state(), ContextState::Filling(10));
    assert_eq!(ctx.stats().reclamations, 0);
}

#[test]
fn request_after_full_cycle_reclaims_exactly_once() {
    let mut ctx = arena_context(10, 10, 100);
    for _ in 0..10 {
        ctx.request_object().expect("request");
    }

    ctx.request_object().expect("11th request");

    assert_eq!(ctx.stats().reclamations, 1);
    assert_eq!(ctx.alloc_count(), 1);
    assert_eq!(ctx.strategy().top(), 10);
}

#[test]
fn objects_have_configured_size_and_are_writable() {
    let mut ctx = arena_context(16, 4, 64);
    let bytes = ctx.request_object().expect("request");
    assert_eq!(bytes.len(), 16);
    bytes.copy_from_slice(&[0xAB; 16]);
}

#[test]
fn reclaim_on_empty_context_is_harmless() {
    let mut ctx = arena_context(10, 10, 100);
    ctx.reclaim().expect("empty reclaim");
    ctx.reclaim().expect("empty reclaim again");

    assert_eq!(ctx.state(), ContextState::Empty);
    ctx.request_object().expect("request after reclaim");
    assert_eq!(ctx.alloc_count(), 1);
}

#[test]
fn finish_closes_partial_cycle() {
    let mut ctx = arena_context(10, 10, 100);
    for _ in 0..5 {
        ctx.request_object().expect("request");
    }

    ctx.finish().expect("finish");
    assert_eq!(ctx.alloc_count(), 0);
    assert_eq!(ctx.stats().reclamations, 1);

    // Nothing outstanding: a second finish is a no-op.
    ctx.finish().expect("finish again");
    assert_eq!(ctx.stats().reclamations, 1);
}

// ===== Arena batching =====

#[test]
fn arena_reserves_once_per_cycle() {
    let mut ctx = arena_context(10, 10, 100);
    for _ in 0..30 {
        ctx.request_object().expect("request");
    }

    let stats = ctx.stats();
    assert_eq!(stats.objects_allocated, 30);
    assert_eq!(stats.reservations, 3);
    assert_eq!(stats.releases, 2);
}

#[test]
fn arena_out_of_space_is_not_counted() {
    let mut ctx = arena_context(10, 10, 95);
    for _ in 0..9 {
        ctx.request_object().expect("request");
    }

    let err = ctx.request_object().unwrap_err();
    assert_eq!(err, AllocError::OutOfSpace { requested: 10, top: 90, capacity: 95 });
    assert_eq!(ctx.alloc_count(), 9);
    assert_eq!(ctx.stats().objects_allocated, 9);
    assert_eq!(ctx.state(), ContextState::Filling(9));
}

// ===== Direct release accounting =====

#[test]
fn direct_releases_every_tracked_object() {
    let heap = CountingHeap::default();
    let released = heap.released.clone();
    let reserved = heap.reserved.clone();
    let mut ctx = counting_context(4, heap);

    for _ in 0..4 {
        ctx.request_object().expect("request");
    }
    assert_eq!(reserved.get(), 4);
    assert_eq!(released.get(), 0);

    ctx.reclaim().expect("reclaim");
    assert_eq!(released.get(), 4);
    assert_eq!(ctx.tracked(), 0);
    assert_eq!(ctx.stats().releases, 4);
}

#[test]
fn dropping_context_releases_outstanding_objects() {
    let heap = CountingHeap::default();
    let released = heap.released.clone();
    {
        let mut ctx = counting_context(8, heap);
        for _ in 0..3 {
            ctx.request_object().expect("request");
        }
    }
    assert_eq!(released.get(), 3);
}

// ===== Faults =====

#[test]
fn release_fault_faults_the_context() {
    let heap = CountingHeap {
        fail_release: Some(3),
        ..CountingHeap::default()
    };
    let reserved = heap.reserved.clone();
    let mut ctx = counting_context(5, heap);
    for _ in 0..5 {
        ctx.request_object().expect("request");
    }

    assert_eq!(ctx.reclaim(), Err(AllocError::ReclaimFailed { slot: 2 }));
    assert_eq!(ctx.state(), ContextState::Faulted);
    // The two released entries and the failed one are gone from tracking.
    assert_eq!(ctx.tracked(), 2);

    let before = reserved.get();
    assert_eq!(
        ctx.request_object().unwrap_err(),
        AllocError::ReclaimFailed { slot: 2 }
    );
    assert_eq!(reserved.get(), before);
}

#[test]
fn faulted_context_releases_remaining_entries_on_drop() {
    let heap = CountingHeap {
        fail_release: Some(1),
        ..CountingHeap::default()
    };
    let released = heap.released.clone();
    {
        let mut ctx = counting_context(3, heap);
        for _ in 0..3 {
            ctx.request_object().expect("request");
        }
        assert!(ctx.reclaim().is_err());
        assert_eq!(released.get(), 0);
    }
    // Slots 1 and 2 were never released by the failed cycle.
    assert_eq!(released.get(), 2);
}

#[test]
fn out_of_memory_propagates_unchanged() {
    struct ExhaustedHeap;

    unsafe impl Heap for ExhaustedHeap {
        fn reserve(&mut self, _layout: Layout) -> Option<NonNull<u8>> {
            None
        }

        unsafe fn release(&mut self, _ptr: NonNull<u8>, _layout: Layout) -> Result<(), HeapFault> {
            Ok(())
        }
    }

    let direct = DirectAllocator::with_heap(10, ExhaustedHeap).expect("direct allocator");
    let mut ctx = AllocationContext::new(direct, 4).expect("context");

    assert_eq!(
        ctx.request_object().unwrap_err(),
        AllocError::OutOfMemory { size: 10 }
    );
    assert_eq!(ctx.state(), ContextState::Empty);
}
