//! Fixed-capacity tracking list for outstanding objects

/// Slot array holding the handles issued since the last reclamation.
///
/// Sized once at construction and never grown, so bookkeeping adds no
/// allocation to the request path. Slots `[0, len)` hold live handles; every
/// slot past `len` is `None`.
pub struct SlotTable<H> {
    slots: Box<[Option<H>]>,
    len: usize,
}

impl<H> SlotTable<H> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            len: 0,
        }
    }

    /// Store `handle` in the next free slot and return its index.
    ///
    /// Panics if the table is full; callers reclaim before that happens.
    #[inline]
    pub fn push(&mut self, handle: H) -> usize {
        let index = self.len;
        self.slots[index] = Some(handle);
        self.len += 1;
        index
    }

    /// Slots filled since the last clear. Entries may already be `None` if a
    /// reclamation took them and then stopped early.
    #[inline]
    pub fn live_mut(&mut self) -> &mut [Option<H>] {
        &mut self.slots[..self.len]
    }

    /// Empty every slot, not just the live prefix, so nothing from an earlier
    /// cycle can be read again.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.len = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len >= self.slots.len()
    }

    /// Number of slots currently holding a handle.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_fills_slots_in_order() {
        let mut table = SlotTable::new(3);
        assert_eq!(table.push('a'), 0);
        assert_eq!(table.push('b'), 1);
        assert_eq!(table.live_mut(), &mut [Some('a'), Some('b')][..]);
        assert!(!table.is_full());
    }

    #[test]
    #[should_panic]
    fn push_past_capacity_panics() {
        let mut table = SlotTable::new(1);
        table.push(1u32);
        assert!(table.is_full());
        table.push(2);
    }

    #[test]
    fn clear_empties_every_slot() {
        let mut table = SlotTable::new(4);
        for i in 0..4 {
            table.push(i);
        }
        table.live_mut()[1] = None;
        table.clear();

        assert_eq!(table.len(), 0);
        assert_eq!(table.occupied(), 0);
        assert_eq!(table.capacity(), 4);
    }

    #[test]
    fn zero_capacity_table_is_always_full() {
        let table: SlotTable<u8> = SlotTable::new(0);
        assert!(table.is_full());
        assert!(table.is_empty());
    }
}
