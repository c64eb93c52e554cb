//! Host-side stand-in for physical RAM.
//!
//! An [`Arena`] is a page-aligned heap buffer that pretends to be the physical
//! range `[base, base + pages * 4 KiB)`. Its [`HhdmPhysMapper`] offset points
//! physical addresses into the buffer.

#![allow(dead_code)]

use kernel_alloc::HhdmPhysMapper;
use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalRange, Size4K};
use std::alloc::{Layout, alloc_zeroed, dealloc, handle_alloc_error};
use std::ptr::NonNull;

/// Physical base used by most tests.
pub const A: u64 = 0x8000_0000;

pub const PAGE: u64 = Size4K::SIZE;

pub struct Arena {
    ptr: NonNull<u8>,
    layout: Layout,
    base: PhysicalAddress,
    pages: usize,
}

impl Arena {
    pub fn new(base: u64, pages: usize) -> Self {
        let layout = Layout::from_size_align(pages.max(1) * 4096, 4096).unwrap();
        let ptr = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).unwrap_or_else(|| handle_alloc_error(layout));
        Self {
            ptr,
            layout,
            base: PhysicalAddress::new(base),
            pages,
        }
    }

    pub fn range(&self) -> PhysicalRange {
        PhysicalRange::new(self.base, self.base + self.pages as u64 * PAGE)
    }

    pub fn mapper(&self) -> HhdmPhysMapper {
        let host = self.ptr.as_ptr().expose_provenance() as u64;
        HhdmPhysMapper::new(host.wrapping_sub(self.base.as_u64()))
    }

    /// The bytes of the page at `pa`.
    pub fn page(&self, pa: impl Into<PhysicalAddress>) -> &[u8] {
        let pa = pa.into();
        assert!(self.range().contains(pa), "{pa} outside arena");
        let offset = usize::try_from(pa.as_u64() - self.base.as_u64()).unwrap();
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().add(offset), 4096) }
    }

    /// Overwrites the page at `pa`, as an owner of the page would.
    pub fn scribble(&self, pa: impl Into<PhysicalAddress>, byte: u8) {
        let pa = pa.into();
        assert!(self.range().contains(pa), "{pa} outside arena");
        let offset = usize::try_from(pa.as_u64() - self.base.as_u64()).unwrap();
        unsafe { std::ptr::write_bytes(self.ptr.as_ptr().add(offset), byte, 4096) };
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

// The arena only hands out raw memory; synchronisation is the allocator's job.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}
