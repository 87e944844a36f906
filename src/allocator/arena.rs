//! Bump arena - one reservation per reclamation cycle
//!
//! Design: objects are carved from a single owned buffer by advancing a
//! cursor. Handles are byte ranges into that buffer, not addresses, and the
//! whole buffer is dropped on reset regardless of how many objects it holds.

use super::{Strategy, StrategyKind};
use crate::errors::AllocError;
use crate::logging::log_arena_reserved;

/// Byte range of one object inside an arena buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectSpan {
    offset: usize,
    len: usize,
}

impl ObjectSpan {
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last byte of the span.
    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Whether two spans share at least one byte.
    pub fn overlaps(&self, other: &ObjectSpan) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Fixed-capacity bump allocator for `object_size`-byte objects.
///
/// The buffer is reserved lazily by the first allocation after a reset, so a
/// full cycle costs exactly one reservation and one release.
pub struct Arena {
    buffer: Option<Box<[u8]>>,
    top: usize,
    capacity: usize,
    object_size: usize,
    reservations: u64,
    releases: u64,
}

impl Arena {
    pub fn new(capacity: usize, object_size: usize) -> Self {
        Self {
            buffer: None,
            top: 0,
            capacity,
            object_size,
            reservations: 0,
            releases: 0,
        }
    }

    /// Carve the next object out of the buffer.
    ///
    /// Fails with `OutOfSpace` when the object would cross the end of the
    /// buffer; the cursor is left untouched in that case.
    #[inline]
    pub fn allocate(&mut self) -> Result<(ObjectSpan, &mut [u8]), AllocError> {
        let end = match self.top.checked_add(self.object_size) {
            Some(end) if end <= self.capacity => end,
            _ => {
                return Err(AllocError::OutOfSpace {
                    requested: self.object_size,
                    top: self.top,
                    capacity: self.capacity,
                })
            }
        };

        if self.buffer.is_none() {
            self.buffer = Some(reserve_buffer(self.capacity)?);
            self.reservations += 1;
            log_arena_reserved(self.capacity, self.reservations);
        }

        let span = ObjectSpan {
            offset: self.top,
            len: self.object_size,
        };
        self.top = end;

        let buffer = self
            .buffer
            .as_deref_mut()
            .ok_or(AllocError::OutOfMemory { size: self.capacity })?;
        Ok((span, &mut buffer[span.offset..span.end()]))
    }

    /// Drop the buffer and rewind the cursor. Every span handed out so far
    /// becomes invalid.
    #[inline]
    pub fn reset(&mut self) {
        if self.buffer.take().is_some() {
            self.releases += 1;
        }
        self.top = 0;
    }

    /// Read back an object issued since the last reset.
    pub fn get(&self, span: ObjectSpan) -> Option<&[u8]> {
        if span.end() > self.top {
            return None;
        }
        self.buffer.as_deref().map(|buffer| &buffer[span.offset..span.end()])
    }

    /// Offset of the first free byte.
    #[inline]
    pub fn top(&self) -> usize {
        self.top
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.top
    }

    /// Whether a buffer is currently held.
    #[inline]
    pub fn is_reserved(&self) -> bool {
        self.buffer.is_some()
    }
}

impl Strategy for Arena {
    type Handle = ObjectSpan;

    const KIND: StrategyKind = StrategyKind::Arena;

    #[inline]
    fn allocate(&mut self) -> Result<(ObjectSpan, &mut [u8]), AllocError> {
        Arena::allocate(self)
    }

    /// Spans need no individual release; dropping the buffer covers them all.
    unsafe fn reclaim(&mut self, _outstanding: &mut [Option<ObjectSpan>]) -> Result<(), AllocError> {
        self.reset();
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

/// Reserve a zeroed buffer, reporting exhaustion instead of aborting.
fn reserve_buffer(capacity: usize) -> Result<Box<[u8]>, AllocError> {
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(capacity)
        .map_err(|_| AllocError::OutOfMemory { size: capacity })?;
    storage.resize(capacity, 0u8);
    Ok(storage.into_boxed_slice())
}
