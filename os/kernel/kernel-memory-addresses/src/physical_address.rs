use crate::{PageSize, PhysicalPage};
use core::fmt;
use core::ops::{Add, AddAssign};

/// Physical memory address.
///
/// A thin `u64` wrapper that denotes **physical** addresses (host RAM).
/// It carries intent and keeps raw integers from leaking into allocator
/// bookkeeping.
///
/// ### Semantics
/// - [`PhysicalAddress::page`] aligns down to the containing page.
/// - [`PhysicalAddress::align_up`] rounds up to the next page boundary and
///   reports overflow instead of wrapping.
/// - [`PhysicalAddress::is_aligned`] checks for a page-aligned address.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pa = PhysicalAddress::new(0x8000_2042);
/// assert!(!pa.is_aligned::<Size4K>());
/// assert_eq!(pa.page::<Size4K>().base().as_u64(), 0x8000_2000);
/// assert_eq!(pa.align_up::<Size4K>().map(PhysicalAddress::as_u64), Some(0x8000_3000));
/// assert_eq!(pa.offset::<Size4K>(), 0x42);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The page of size `S` containing this address (lower bits zeroed).
    #[inline]
    #[must_use]
    pub const fn page<S: PageSize>(self) -> PhysicalPage<S> {
        PhysicalPage::containing_address(self)
    }

    /// The offset of this address within its page of size `S`.
    #[inline]
    #[must_use]
    pub const fn offset<S: PageSize>(self) -> u64 {
        self.0 & S::MASK
    }

    #[inline]
    #[must_use]
    pub const fn is_aligned<S: PageSize>(self) -> bool {
        self.offset::<S>() == 0
    }

    /// Align down to page boundary `S`.
    #[inline]
    #[must_use]
    pub const fn align_down<S: PageSize>(self) -> Self {
        Self(self.0 & !S::MASK)
    }

    /// Align up to page boundary `S`, or `None` if that would overflow.
    #[inline]
    #[must_use]
    pub const fn align_up<S: PageSize>(self) -> Option<Self> {
        match self.0.checked_add(S::MASK) {
            Some(v) => Some(Self(v & !S::MASK)),
            None => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: u64) -> Option<Self> {
        match self.0.checked_add(rhs) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Byte distance from `origin` to `self`, or `None` if `self` lies below it.
    #[inline]
    #[must_use]
    pub const fn checked_offset_from(self, origin: Self) -> Option<u64> {
        self.0.checked_sub(origin.0)
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<PhysicalAddress> for u64 {
    #[inline]
    fn from(a: PhysicalAddress) -> Self {
        a.as_u64()
    }
}

impl<S> From<PhysicalPage<S>> for PhysicalAddress
where
    S: PageSize,
{
    fn from(value: PhysicalPage<S>) -> Self {
        value.base()
    }
}

impl Add<u64> for PhysicalAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl AddAssign<u64> for PhysicalAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}
