//! # Boot-time setup
//!
//! Before the page allocator exists there is no heap to put the
//! reference-count table on, so [`init_from_layout`] carves it out of the
//! first pages of the allocatable range:
//!
//! ```text
//! kernel_end ┌──────────────────────┐
//!            │ refs table (u32/page)│  table_pages
//!            ├──────────────────────┤
//!            │ managed pages        │  handed to the free list
//! phys_top   └──────────────────────┘
//! ```

use crate::error::PageAllocatorInitError;
use crate::page_allocator::PageAllocator;
use crate::phys_mapper::PhysMapper;
use crate::ref_count::RefCount;
use core::{ptr, slice};
use kernel_info::memory::MemoryLayout;
use kernel_memory_addresses::{PageSize, PhysicalRange, Size4K};
use log::info;

/// Number of 4 KiB pages needed to hold `slots` reference counts.
#[must_use]
pub const fn table_pages(slots: usize) -> usize {
    #[allow(clippy::cast_possible_truncation)]
    const PER_PAGE: usize = Size4K::SIZE as usize / size_of::<RefCount>();
    slots.div_ceil(PER_PAGE)
}

/// Builds the kernel's page allocator over `layout`.
///
/// The reference-count table occupies the first pages after the kernel image;
/// everything above it up to `layout.phys_top` is managed.
///
/// # Errors
/// - [`PageAllocatorInitError::InvertedRange`] if `phys_top` lies below `kernel_end`.
/// - [`PageAllocatorInitError::RangeTooLarge`] if the page count overflows `usize`.
/// - [`PageAllocatorInitError::RangeTooSmall`] if no page would be left after
///   placing the table.
///
/// # Safety
/// - All RAM between `layout.kernel_end` and `layout.phys_top` must be unused
///   and is owned by the returned allocator from now on.
/// - `mapper` must map that range to writable memory for the `'static` lifetime.
pub unsafe fn init_from_layout<M: PhysMapper>(
    layout: &MemoryLayout,
    mapper: M,
) -> Result<PageAllocator<'static, M>, PageAllocatorInitError> {
    let range = layout.allocatable();
    if range.end() < range.start() {
        return Err(PageAllocatorInitError::InvertedRange {
            start: range.start(),
            end: range.end(),
        });
    }

    let total = usize::try_from(range.page_count::<Size4K>())
        .map_err(|_| PageAllocatorInitError::RangeTooLarge(range))?;
    // Counting the table's own pages over-reserves by at most one slot per table page.
    let reserved = table_pages(total);
    let Some(first) = range.pages::<Size4K>().next() else {
        return Err(PageAllocatorInitError::RangeTooSmall(range));
    };
    if reserved >= total {
        return Err(PageAllocatorInitError::RangeTooSmall(range));
    }

    let slots = total - reserved;
    let table_start = first.base();
    let managed_start = table_start + ((reserved as u64) << Size4K::SHIFT);
    let managed = PhysicalRange::new(managed_start, range.end());

    let table = mapper.phys_to_ptr::<RefCount>(table_start);
    // SAFETY: The caller hands us the range; the table pages are never managed.
    let table: &'static mut [RefCount] = unsafe {
        ptr::write_bytes(table, 0, slots);
        slice::from_raw_parts_mut(table, slots)
    };

    info!("refs: {slots} counters in {reserved} pages at {table_start}..{managed_start}");
    unsafe { PageAllocator::new(managed, table, mapper) }
}
