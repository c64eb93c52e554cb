use crate::{PageSize, PhysicalAddress};
use core::fmt;
use core::marker::PhantomData;

/// Physical memory page base for size `S`.
///
/// A `PhysicalPage<S>` represents the **page-aligned base** of a physical page
/// of size `S` (`S::SIZE` bytes). This is what the page allocator hands out:
/// a page is identified solely by its starting address.
///
/// ### Invariants
/// - The low `S::SHIFT` bits of the base are always zero (page aligned).
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pa = PhysicalAddress::new(0x8765_4321);
/// assert!(PhysicalPage::<Size4K>::from_aligned(pa).is_none());
///
/// let pp = PhysicalPage::<Size4K>::containing_address(pa);
/// assert_eq!(pp.base().as_u64(), 0x8765_4000);
/// assert_eq!(pp.next().map(|p| p.base().as_u64()), Some(0x8765_5000));
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<S: PageSize> {
    base: u64,
    _phantom: PhantomData<S>,
}

impl<S: PageSize> PhysicalPage<S> {
    /// Page that contains `addr` (aligns down).
    #[inline]
    #[must_use]
    pub const fn containing_address(addr: PhysicalAddress) -> Self {
        Self {
            base: addr.as_u64() & !S::MASK,
            _phantom: PhantomData,
        }
    }

    /// Page starting exactly at `addr`, or `None` if `addr` is unaligned.
    #[inline]
    #[must_use]
    pub const fn from_aligned(addr: PhysicalAddress) -> Option<Self> {
        if addr.is_aligned::<S>() {
            Some(Self::containing_address(addr))
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.base)
    }

    /// First address past the end of this page, or `None` on overflow.
    #[inline]
    #[must_use]
    pub const fn end(self) -> Option<PhysicalAddress> {
        self.base().checked_add(S::SIZE)
    }

    /// The page directly following this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.end() {
            Some(end) => Some(Self::containing_address(end)),
            None => None,
        }
    }
}

impl<S> fmt::Display for PhysicalPage<S>
where
    S: PageSize,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}/{}", self.base, S::as_str())
    }
}

impl<S: PageSize> fmt::Debug for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalPage<{}>({:#018X})", S::as_str(), self.base)
    }
}
