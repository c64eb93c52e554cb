use crate::{PageSize, PhysicalAddress, PhysicalPage};
use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;

/// Half-open range `[start, end)` of physical addresses.
///
/// The bounds need not be aligned; [`PhysicalRange::pages`] only yields the
/// pages of size `S` that lie **entirely** inside the range, i.e. it starts at
/// `start` rounded up and stops before the first page that would cross `end`.
///
/// ```rust
/// # use kernel_memory_addresses::*;
/// let range = PhysicalRange::new(PhysicalAddress::new(0x1001), PhysicalAddress::new(0x4800));
/// let bases: Vec<u64> = range.pages::<Size4K>().map(|p| p.base().as_u64()).collect();
/// assert_eq!(bases, [0x2000, 0x3000]);
/// assert_eq!(range.page_count::<Size4K>(), 2);
/// ```
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct PhysicalRange {
    start: PhysicalAddress,
    end: PhysicalAddress,
}

impl PhysicalRange {
    /// Creates the range `[start, end)`. An `end` below `start` yields an empty range.
    #[inline]
    #[must_use]
    pub const fn new(start: PhysicalAddress, end: PhysicalAddress) -> Self {
        Self { start, end }
    }

    #[inline]
    #[must_use]
    pub const fn start(&self) -> PhysicalAddress {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn end(&self) -> PhysicalAddress {
        self.end
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end.as_u64() <= self.start.as_u64()
    }

    /// Length in bytes (zero for an inverted range).
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end.as_u64().saturating_sub(self.start.as_u64())
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, pa: PhysicalAddress) -> bool {
        pa.as_u64() >= self.start.as_u64() && pa.as_u64() < self.end.as_u64()
    }

    /// Number of whole pages of size `S` inside the range.
    #[inline]
    #[must_use]
    pub fn page_count<S: PageSize>(&self) -> u64 {
        let pages = self.pages::<S>();
        (pages.end - pages.next) >> S::SHIFT
    }

    /// Iterates all whole pages of size `S` inside the range, lowest first.
    #[inline]
    #[must_use]
    pub fn pages<S: PageSize>(&self) -> PhysicalPages<S> {
        let end = self.end.align_down::<S>().as_u64();
        let next = self
            .start
            .align_up::<S>()
            .map_or(end, PhysicalAddress::as_u64)
            .min(end);
        PhysicalPages {
            next,
            end,
            _phantom: PhantomData,
        }
    }
}

impl fmt::Debug for PhysicalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalRange({}..{})", self.start, self.end)
    }
}

/// Iterator over the whole pages of a [`PhysicalRange`].
#[derive(Clone)]
pub struct PhysicalPages<S: PageSize> {
    next: u64,
    end: u64,
    _phantom: PhantomData<S>,
}

impl<S: PageSize> Iterator for PhysicalPages<S> {
    type Item = PhysicalPage<S>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let page = PhysicalPage::containing_address(PhysicalAddress::new(self.next));
        self.next += S::SIZE;
        Some(page)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from((self.end - self.next) >> S::SHIFT).ok();
        (remaining.unwrap_or(usize::MAX), remaining)
    }
}

impl<S: PageSize> FusedIterator for PhysicalPages<S> {}
