//! # Memory Layout

use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalRange, Size4K};

/// Size of the pages handed out by the page allocator.
pub const PAGE_SIZE: u64 = Size4K::SIZE;

/// Physical address the kernel image is loaded at.
pub const KERNEL_BASE: u64 = 0x8000_0000;

/// Amount of RAM on the reference board.
pub const RAM_SIZE: u64 = 128 * 1024 * 1024; // 128 MiB

/// First address past usable physical memory.
pub const PHYS_TOP: u64 = KERNEL_BASE + RAM_SIZE;

/// Byte written over a page when it is allocated.
pub const ALLOC_JUNK: u8 = 0x05;

/// Byte written over a page when its last owner releases it.
pub const FREE_JUNK: u8 = 0x01;

const _: () = {
    assert!(KERNEL_BASE.is_multiple_of(PAGE_SIZE));
    assert!(PHYS_TOP.is_multiple_of(PAGE_SIZE));
    assert!(PHYS_TOP > KERNEL_BASE);
    assert!(ALLOC_JUNK != FREE_JUNK);
};

/// Physical memory bounds handed to the page allocator at boot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MemoryLayout {
    /// First address after the kernel image (linker symbol `end`).
    pub kernel_end: PhysicalAddress,
    /// First address past usable physical memory.
    pub phys_top: PhysicalAddress,
}

impl MemoryLayout {
    #[must_use]
    pub const fn new(kernel_end: PhysicalAddress, phys_top: PhysicalAddress) -> Self {
        Self {
            kernel_end,
            phys_top,
        }
    }

    /// Layout of the reference board for a kernel image ending at `kernel_end`.
    #[must_use]
    pub const fn with_kernel_end(kernel_end: PhysicalAddress) -> Self {
        Self::new(kernel_end, PhysicalAddress::new(PHYS_TOP))
    }

    /// The physical range left over for the page allocator.
    #[must_use]
    pub const fn allocatable(&self) -> PhysicalRange {
        PhysicalRange::new(self.kernel_end, self.phys_top)
    }
}
