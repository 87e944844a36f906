//! Allocation context - count-triggered batch reclamation
//!
//! Design: the context owns one [`Strategy`] and a fixed slot table sized to
//! the reclaim interval. Every request first checks whether the previous
//! cycle is full and, if so, reclaims it before allocating:
//! 1. Full cycle observed -> reclaim synchronously
//! 2. Delegate to the strategy
//! 3. Record the handle, hand the bytes to the caller
//!
//! Object bytes are returned as `&mut [u8]` borrowed from the context, so
//! the borrow checker rejects any view held across the next request.

mod slots;

#[cfg(test)]
mod tests;

pub use slots::SlotTable;

use crate::allocator::{Strategy, StrategyKind};
use crate::errors::{AllocError, ConfigError};
use crate::logging::{log_reclaim_complete, log_reclaim_failed, log_reclaim_start};
use serde::Serialize;

/// Observable phase of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// No objects outstanding.
    Empty,
    /// `k` objects issued in the current cycle, `1 <= k <= reclaim_interval`.
    Filling(usize),
    /// A reclamation failed; the context refuses further work.
    Faulted,
}

/// Running counters for one context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContextStats {
    pub objects_allocated: u64,
    pub reclamations: u64,
    pub reservations: u64,
    pub releases: u64,
}

impl ContextStats {
    /// Fold another context's counters into these.
    pub fn merge(&mut self, other: &ContextStats) {
        self.objects_allocated += other.objects_allocated;
        self.reclamations += other.reclamations;
        self.reservations += other.reservations;
        self.releases += other.releases;
    }

    /// Counters accumulated since `earlier` was taken from the same context.
    pub fn since(&self, earlier: &ContextStats) -> ContextStats {
        ContextStats {
            objects_allocated: self.objects_allocated - earlier.objects_allocated,
            reclamations: self.reclamations - earlier.reclamations,
            reservations: self.reservations - earlier.reservations,
            releases: self.releases - earlier.releases,
        }
    }
}

/// Hands out short-lived objects and reclaims them in batches of
/// `reclaim_interval`.
pub struct AllocationContext<S: Strategy> {
    strategy: S,
    slots: SlotTable<S::Handle>,
    objects_allocated: u64,
    reclamations: u64,
    fault: Option<AllocError>,
}

impl<S: Strategy> AllocationContext<S> {
    pub fn new(strategy: S, reclaim_interval: usize) -> Result<Self, ConfigError> {
        if reclaim_interval == 0 {
            return Err(ConfigError::ZeroReclaimInterval);
        }

        Ok(Self {
            strategy,
            slots: SlotTable::new(reclaim_interval),
            objects_allocated: 0,
            reclamations: 0,
            fault: None,
        })
    }

    /// Hand out one object, reclaiming the previous cycle first if it is full.
    ///
    /// A failed request is not counted and leaves the cycle as it was.
    #[inline]
    pub fn request_object(&mut self) -> Result<&mut [u8], AllocError> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }

        if self.slots.is_full() {
            self.reclaim()?;
        }

        let (handle, bytes) = self.strategy.allocate()?;
        self.slots.push(handle);
        self.objects_allocated += 1;
        Ok(bytes)
    }

    /// Reclaim every object issued in the current cycle.
    ///
    /// On failure the context becomes [`ContextState::Faulted`]: the error is
    /// kept and returned by every later call.
    pub fn reclaim(&mut self) -> Result<(), AllocError> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }

        let outstanding = self.slots.len();
        log_reclaim_start(S::KIND.as_str(), outstanding);

        // Every handle in the table came from `self.strategy.allocate` and
        // is cleared as soon as it is reclaimed.
        let result = unsafe { self.strategy.reclaim(self.slots.live_mut()) };

        match result {
            Ok(()) => {
                self.slots.clear();
                self.reclamations += 1;
                log_reclaim_complete(S::KIND.as_str(), outstanding, self.reclamations);
                Ok(())
            }
            Err(err) => {
                let err = match err {
                    AllocError::ReclaimFailed { .. } => err,
                    _ => AllocError::ReclaimFailed { slot: 0 },
                };
                log_reclaim_failed(S::KIND.as_str(), &err);
                self.fault = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Close out the trailing partial cycle so nothing stays outstanding.
    pub fn finish(&mut self) -> Result<(), AllocError> {
        if self.slots.is_empty() && self.fault.is_none() {
            return Ok(());
        }
        self.reclaim()
    }

    /// Objects issued since the last reclamation.
    #[inline]
    pub fn alloc_count(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn reclaim_interval(&self) -> usize {
        self.slots.capacity()
    }

    pub fn state(&self) -> ContextState {
        if self.fault.is_some() {
            ContextState::Faulted
        } else if self.slots.is_empty() {
            ContextState::Empty
        } else {
            ContextState::Filling(self.slots.len())
        }
    }

    pub fn stats(&self) -> ContextStats {
        ContextStats {
            objects_allocated: self.objects_allocated,
            reclamations: self.reclamations,
            reservations: self.strategy.reservations(),
            releases: self.strategy.releases(),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        S::KIND
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Slots still holding a handle. Equals `alloc_count` except after a
    /// failed reclamation.
    pub fn tracked(&self) -> usize {
        self.slots.occupied()
    }
}

impl<S: Strategy> Drop for AllocationContext<S> {
    fn drop(&mut self) {
        if self.slots.occupied() == 0 {
            return;
        }
        // Same invariant as `reclaim`; entries taken by a failed cycle are
        // already `None` and are skipped.
        if let Err(err) = unsafe { self.strategy.reclaim(self.slots.live_mut()) } {
            tracing::warn!(
                strategy = S::KIND.as_str(),
                error = %err,
                "Outstanding objects leaked on drop"
            );
        }
        self.slots.clear();
    }
}
