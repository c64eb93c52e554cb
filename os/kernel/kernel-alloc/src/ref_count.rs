//! # Per-page reference counts
//!
//! One counter per managed page, stored in a flat table indexed by
//! [`PageRegion::index_of`]. A count is the number of live owners of a page.
//! The [`PageAllocator`](crate::PageAllocator) sets it to 1 on allocation and
//! only returns the page to the free list once it drops to 0; a copy-on-write
//! layer bumps it with [`RefCountTable::increment`] when it shares a page.
//!
//! ```text
//! Free ──alloc (set 1)──▶ Owned(1) ──increment──▶ Owned(n + 1)
//!                          │    ▲
//!   Free ◀──decrement──────┘    └──decrement (n - 1 > 0)── Owned(n)
//! ```
//!
//! Every operation takes the table's lock for the whole read-modify-write.
//! The lock is never held together with the free-list lock.

use crate::error::AddressError;
use crate::region::PageRegion;
use core::fmt;
use kernel_memory_addresses::PhysicalAddress;
use kernel_sync::SpinLock;
use log::error;

/// Counter type of a single table slot.
pub type RefCount = u32;

/// Reference counts of all pages in a [`PageRegion`].
pub struct RefCountTable<'a> {
    region: PageRegion,
    counts: SpinLock<&'a mut [RefCount]>,
}

impl<'a> RefCountTable<'a> {
    /// Wraps `counts` as the table for `region`.
    ///
    /// Only the first `region.len()` slots are used; the caller checked that
    /// there are at least that many.
    pub(crate) fn new(region: PageRegion, counts: &'a mut [RefCount]) -> Self {
        debug_assert!(counts.len() >= region.len());
        let counts = &mut counts[..region.len()];
        Self {
            region,
            counts: SpinLock::named("refs", counts),
        }
    }

    /// Sets the count of the page at `pa` to exactly `n`.
    ///
    /// # Panics
    /// If `pa` is not the base of a managed page.
    pub fn set(&self, pa: impl Into<PhysicalAddress>, n: RefCount) {
        let index = self.index(pa.into());
        self.counts.with_lock(|counts| counts[index] = n);
    }

    /// Adds an owner to the page at `pa` and returns the new count.
    ///
    /// # Panics
    /// If `pa` is not the base of a managed page.
    pub fn increment(&self, pa: impl Into<PhysicalAddress>) -> RefCount {
        let index = self.index(pa.into());
        self.counts.with_lock(|counts| {
            let slot = &mut counts[index];
            debug_assert!(*slot < RefCount::MAX, "refs: count overflow");
            *slot = slot.wrapping_add(1);
            *slot
        })
    }

    /// Drops an owner of the page at `pa` and returns the remaining count.
    ///
    /// Callers must never decrement more often than the page was allocated or
    /// incremented. Debug builds assert this; release builds do not check.
    ///
    /// # Panics
    /// If `pa` is not the base of a managed page.
    pub fn decrement(&self, pa: impl Into<PhysicalAddress>) -> RefCount {
        let pa = pa.into();
        let index = self.index(pa);
        self.counts.with_lock(|counts| {
            let slot = &mut counts[index];
            debug_assert!(*slot > 0, "refs: decrement of unreferenced page {pa}");
            *slot = slot.wrapping_sub(1);
            *slot
        })
    }

    /// Current count of the page at `pa`.
    ///
    /// # Panics
    /// If `pa` is not the base of a managed page.
    #[must_use]
    pub fn get(&self, pa: impl Into<PhysicalAddress>) -> RefCount {
        let index = self.index(pa.into());
        self.counts.with_lock(|counts| counts[index])
    }

    /// The region whose pages this table counts.
    #[must_use]
    pub const fn region(&self) -> &PageRegion {
        &self.region
    }

    /// Sets every slot to `n`. Used once while populating the allocator.
    pub(crate) fn reset_all(&self, n: RefCount) {
        self.counts.with_lock(|counts| counts.fill(n));
    }

    fn index(&self, pa: PhysicalAddress) -> usize {
        match self.region.index_of(pa) {
            Ok(index) => index,
            Err(e) => fatal(&e),
        }
    }
}

#[cold]
fn fatal(e: &AddressError) -> ! {
    error!("refs: {e}");
    panic!("refs: {e}");
}

impl fmt::Debug for RefCountTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefCountTable")
            .field("region", &self.region)
            .field("lock", &self.counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::{PageSize, PhysicalRange, Size4K};

    const A: u64 = 0x8000_0000;

    fn region(pages: u64) -> PageRegion {
        let start = PhysicalAddress::new(A);
        PageRegion::from_range(PhysicalRange::new(start, start + pages * Size4K::SIZE)).unwrap()
    }

    #[test]
    fn set_get_increment_decrement() {
        let mut slots: [RefCount; 4] = [0; 4];
        let table = RefCountTable::new(region(4), &mut slots);
        let pa = PhysicalAddress::new(A + 0x1000);

        table.set(pa, 1);
        assert_eq!(table.get(pa), 1);
        assert_eq!(table.increment(pa), 2);
        assert_eq!(table.increment(pa), 3);
        assert_eq!(table.decrement(pa), 2);
        assert_eq!(table.get(pa), 2);

        // neighbours are untouched
        assert_eq!(table.get(PhysicalAddress::new(A)), 0);
        assert_eq!(table.get(PhysicalAddress::new(A + 0x2000)), 0);
    }

    #[test]
    fn reset_all_only_touches_managed_slots() {
        let mut slots: [RefCount; 6] = [7; 6];
        {
            let table = RefCountTable::new(region(4), &mut slots);
            table.reset_all(1);
            assert!(table.region().pages().all(|p| table.get(p) == 1));
        }
        assert_eq!(slots, [1, 1, 1, 1, 7, 7]);
    }

    #[test]
    #[should_panic(expected = "is not page aligned")]
    fn misaligned_address_is_fatal() {
        let mut slots: [RefCount; 2] = [0; 2];
        let table = RefCountTable::new(region(2), &mut slots);
        table.increment(PhysicalAddress::new(A + 1));
    }

    #[test]
    #[should_panic(expected = "at or above the end of the managed region")]
    fn address_past_region_is_fatal() {
        let mut slots: [RefCount; 2] = [0; 2];
        let table = RefCountTable::new(region(2), &mut slots);
        let _ = table.get(PhysicalAddress::new(A + 0x2000));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "decrement of unreferenced page")]
    fn underflow_is_caught_in_debug_builds() {
        let mut slots: [RefCount; 1] = [0; 1];
        let table = RefCountTable::new(region(1), &mut slots);
        table.decrement(PhysicalAddress::new(A));
    }

    #[test]
    fn concurrent_increments_are_serialized() {
        let mut slots: [RefCount; 1] = [0; 1];
        let table = RefCountTable::new(region(1), &mut slots);
        let pa = PhysicalAddress::new(A);
        table.set(pa, 1);

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..1_000 {
                        table.increment(pa);
                    }
                });
            }
        });
        assert_eq!(table.get(pa), 4_001);

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..1_000 {
                        table.decrement(pa);
                    }
                });
            }
        });
        assert_eq!(table.get(pa), 1);
    }
}
