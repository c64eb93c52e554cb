//! # Physical page allocator
//!
//! Hands out and takes back single 4 KiB pages from a fixed physical region,
//! gating reclamation on the per-page [reference counts](crate::RefCountTable).
//!
//! ## Locking
//!
//! Two independent spinlocks:
//!
//! | Lock   | Guards                         |
//! |--------|--------------------------------|
//! | `kmem` | the intrusive free list        |
//! | `refs` | the reference-count table      |
//!
//! No code path holds both at once. [`PageAllocator::allocate`] pops under
//! `kmem`, releases it and then sets the count under `refs`; the popped page is
//! owned by that call alone in between, so nobody can observe its stale count.
//! [`PageAllocator::free`] decrements under `refs`, releases it and only then,
//! if the count hit zero, pushes under `kmem`.

use crate::error::{AddressError, PageAllocatorInitError};
use crate::free_list::FreeList;
use crate::phys_mapper::PhysMapper;
use crate::ref_count::{RefCount, RefCountTable};
use crate::region::PageRegion;
use core::{fmt, ptr};
use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage, PhysicalRange, Size4K};
use kernel_sync::SpinLock;
use log::{debug, error, info, trace};

#[allow(clippy::cast_possible_truncation)]
const PAGE_BYTES: usize = Size4K::SIZE as usize;

/// Snapshot of the allocator's page accounting.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PageAllocatorStats {
    /// Pages in the managed region.
    pub total_pages: usize,
    /// Pages currently on the free list.
    pub free_pages: usize,
}

impl PageAllocatorStats {
    /// Pages currently owned by at least one caller.
    #[must_use]
    pub const fn allocated_pages(&self) -> usize {
        self.total_pages - self.free_pages
    }
}

/// Allocator for the 4 KiB pages of one physical region.
///
/// Construct it once at boot and share it by reference with every subsystem
/// that needs pages. Instances over disjoint regions are independent.
///
/// # Caller contract
/// An address must not be used after its last release: once the final
/// [`free`](Self::free) returns, the page belongs to the allocator again and
/// may be handed to someone else.
pub struct PageAllocator<'a, M: PhysMapper> {
    region: PageRegion,
    free: SpinLock<FreeList>,
    refs: RefCountTable<'a>,
    mapper: M,
}

impl<'a, M: PhysMapper> PageAllocator<'a, M> {
    /// Creates an allocator for the whole pages of `range` and frees every one
    /// of them into the pool.
    ///
    /// Each page's count starts at 1 and population goes through the regular
    /// [`free`](Self::free) path, so every page ends up listed with count 0.
    ///
    /// # Errors
    /// - [`PageAllocatorInitError::InvertedRange`] if `range` ends before it starts.
    /// - [`PageAllocatorInitError::RangeTooLarge`] if the page count overflows `usize`.
    /// - [`PageAllocatorInitError::TableTooSmall`] if `ref_counts` has fewer
    ///   slots than the range has pages.
    ///
    /// # Safety
    /// - Every page in `range` must be unused RAM, exclusively owned by the
    ///   returned allocator from now on.
    /// - `mapper` must map the whole range to writable memory for as long as
    ///   the allocator lives.
    pub unsafe fn new(
        range: PhysicalRange,
        ref_counts: &'a mut [RefCount],
        mapper: M,
    ) -> Result<Self, PageAllocatorInitError> {
        let region = PageRegion::from_range(range)?;
        if ref_counts.len() < region.len() {
            return Err(PageAllocatorInitError::TableTooSmall {
                required: region.len(),
                provided: ref_counts.len(),
            });
        }

        let allocator = Self {
            region,
            free: SpinLock::named("kmem", FreeList::new()),
            refs: RefCountTable::new(region, ref_counts),
            mapper,
        };

        allocator.refs.reset_all(1);
        for page in region.pages() {
            // SAFETY: The caller hands us every page in the region.
            unsafe { allocator.free(page) };
        }

        info!(
            "kmem: managing {} pages at {}..{}",
            region.len(),
            region.start(),
            region.end()
        );
        Ok(allocator)
    }

    /// Takes one page off the free list.
    ///
    /// The page comes back with a reference count of 1 and, with the
    /// `junk-fill` feature, every byte set to [`ALLOC_JUNK`](kernel_info::memory::ALLOC_JUNK).
    /// Returns `None` when no page is left; that is an ordinary outcome the
    /// caller has to handle.
    pub fn allocate(&self) -> Option<PhysicalPage<Size4K>> {
        // SAFETY: Pages are only ever pushed with this mapper, under this lock.
        let popped = self.free.with_lock(|list| unsafe { list.pop(&self.mapper) });
        let Some(page) = popped else {
            debug!("kmem: out of pages");
            return None;
        };

        // Nobody else can reach `page` until we return it.
        self.refs.set(page, 1);

        #[cfg(feature = "junk-fill")]
        unsafe {
            self.fill(page, kernel_info::memory::ALLOC_JUNK);
        }

        trace!("kmem: allocated {page}");
        Some(page)
    }

    /// Like [`allocate`](Self::allocate), but the page is zero-filled.
    pub fn allocate_zeroed(&self) -> Option<PhysicalPage<Size4K>> {
        let page = self.allocate()?;
        // SAFETY: The page was just handed to us.
        unsafe { self.fill(page, 0) };
        Some(page)
    }

    /// Drops one reference to the page at `pa` and returns it to the pool once
    /// no reference is left.
    ///
    /// # Panics
    /// Halts if `pa` is not page aligned or lies outside the managed region.
    /// Such an address means the caller's bookkeeping is corrupt; carrying on
    /// would risk scribbling over unrelated memory.
    ///
    /// # Safety
    /// - `pa` must have been returned by [`allocate`](Self::allocate) (or shared
    ///   through [`RefCountTable::increment`]) and the caller must own one of
    ///   its references.
    /// - The caller must not touch the page after releasing its last reference.
    pub unsafe fn free(&self, pa: impl Into<PhysicalAddress>) {
        let pa = pa.into();
        let page = match self.region.page_of(pa) {
            Ok(page) => page,
            Err(e) => bad_free(&e),
        };

        let remaining = self.refs.decrement(page);
        if remaining > 0 {
            trace!("kmem: {page} still has {remaining} owners");
            return;
        }

        #[cfg(feature = "junk-fill")]
        unsafe {
            self.fill(page, kernel_info::memory::FREE_JUNK);
        }

        // SAFETY: The count hit zero, so the page is ours and not yet listed.
        self.free
            .with_lock(|list| unsafe { list.push(&self.mapper, page) });
        trace!("kmem: freed {page}");
    }

    /// The table gating reclamation, for sharing pages between owners.
    #[must_use]
    pub const fn ref_counts(&self) -> &RefCountTable<'a> {
        &self.refs
    }

    /// The managed pages.
    #[must_use]
    pub const fn region(&self) -> &PageRegion {
        &self.region
    }

    /// Whether `pa` is the base of a page this allocator manages.
    #[must_use]
    pub fn contains(&self, pa: impl Into<PhysicalAddress>) -> bool {
        self.region.contains(pa.into())
    }

    /// The mapper the allocator reaches page memory through.
    #[must_use]
    pub const fn mapper(&self) -> &M {
        &self.mapper
    }

    /// Current free/total page counts.
    #[must_use]
    pub fn stats(&self) -> PageAllocatorStats {
        PageAllocatorStats {
            total_pages: self.region.len(),
            free_pages: self.free.with_lock(|list| list.len()),
        }
    }

    /// # Safety
    /// The caller must own `page`.
    unsafe fn fill(&self, page: PhysicalPage<Size4K>, byte: u8) {
        let dst = self.mapper.phys_to_ptr::<u8>(page.base());
        unsafe { ptr::write_bytes(dst, byte, PAGE_BYTES) };
    }
}

#[cold]
fn bad_free(e: &AddressError) -> ! {
    error!("kfree: {e}");
    panic!("kfree: {e}");
}

impl<M: PhysMapper> fmt::Debug for PageAllocator<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageAllocator")
            .field("region", &self.region)
            .field("free", &self.free)
            .field("refs", &self.refs)
            .finish_non_exhaustive()
    }
}
