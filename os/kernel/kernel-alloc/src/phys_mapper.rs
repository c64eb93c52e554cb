//! # Physical memory access for the page allocator
//!
//! The allocator must touch the pages it manages: it stores the free-list link
//! in the first bytes of every free page and overwrites pages with junk bytes.
//! Code can only dereference virtual addresses, so every such access goes
//! through a [`PhysMapper`] that turns a physical address into a pointer in the
//! current address space.
//!
//! ## Strategies
//! - Identity mapping (early boot, or kernels that run with paging off):
//!   [`HhdmPhysMapper::identity`].
//! - Higher-half direct map at a fixed offset: [`HhdmPhysMapper::new`].
//! - Host-side tests: an offset that maps a physical range onto a heap buffer.

use kernel_memory_addresses::PhysicalAddress;

/// Converts physical addresses to pointers the kernel can dereference.
pub trait PhysMapper {
    /// Pointer to `pa` in the current address space.
    ///
    /// Computing the pointer is always safe; dereferencing it is only valid if
    /// the mapping covers `pa` and the memory is live.
    fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T;

    /// # Safety
    /// - The mapping must be present and cover `size_of::<T>()` bytes at `pa`.
    /// - `pa` must be suitably aligned for `T`.
    /// - The caller must guarantee exclusive access for `'a`.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        // SAFETY: Forwarded to the caller.
        unsafe { &mut *self.phys_to_ptr::<T>(pa) }
    }
}

/// [`PhysMapper`] for a direct map: physical address `pa` lives at `base + pa`.
///
/// # Example
/// ```rust
/// use kernel_alloc::{HhdmPhysMapper, PhysMapper};
/// use kernel_memory_addresses::PhysicalAddress;
///
/// let mapper = HhdmPhysMapper::new(0xffff_8880_0000_0000);
/// let ptr = mapper.phys_to_ptr::<u8>(PhysicalAddress::new(0x8000_1000));
/// assert_eq!(ptr.addr(), 0xffff_8880_8000_1000);
/// ```
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct HhdmPhysMapper {
    base: u64,
}

impl HhdmPhysMapper {
    #[must_use]
    pub const fn new(base: u64) -> Self {
        Self { base }
    }

    /// Physical addresses are used as-is.
    #[must_use]
    pub const fn identity() -> Self {
        Self::new(0)
    }

    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }
}

impl PhysMapper for HhdmPhysMapper {
    #[allow(clippy::cast_possible_truncation)]
    fn phys_to_ptr<T>(&self, pa: PhysicalAddress) -> *mut T {
        let va = self.base.wrapping_add(pa.as_u64());
        core::ptr::with_exposed_provenance_mut(va as usize)
    }
}
