use crate::error::{AddressError, PageAllocatorInitError};
use kernel_memory_addresses::{
    PageSize, PhysicalAddress, PhysicalPage, PhysicalPages, PhysicalRange, Size4K,
};

/// The contiguous run of 4 KiB pages an allocator instance manages.
///
/// This is the only place that turns a physical address into a table index.
/// Every other component routes through [`PageRegion::index_of`] or
/// [`PageRegion::page_of`], which reject misaligned and out-of-range addresses
/// instead of wrapping.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PageRegion {
    start: PhysicalAddress,
    pages: usize,
}

impl PageRegion {
    /// The whole pages inside `range`.
    ///
    /// # Errors
    /// - [`PageAllocatorInitError::InvertedRange`] if `range` ends before it starts.
    /// - [`PageAllocatorInitError::RangeTooLarge`] if the page count does not fit a `usize`.
    pub fn from_range(range: PhysicalRange) -> Result<Self, PageAllocatorInitError> {
        if range.end() < range.start() {
            return Err(PageAllocatorInitError::InvertedRange {
                start: range.start(),
                end: range.end(),
            });
        }

        let pages = usize::try_from(range.page_count::<Size4K>())
            .map_err(|_| PageAllocatorInitError::RangeTooLarge(range))?;
        let start = range
            .pages::<Size4K>()
            .next()
            .map_or_else(|| range.start().align_down::<Size4K>(), PhysicalPage::base);
        Ok(Self { start, pages })
    }

    /// Number of pages in the region.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.pages
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pages == 0
    }

    /// Base of the first managed page.
    #[inline]
    #[must_use]
    pub const fn start(&self) -> PhysicalAddress {
        self.start
    }

    /// First address past the last managed page.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.start.as_u64() + ((self.pages as u64) << Size4K::SHIFT))
    }

    #[inline]
    #[must_use]
    pub const fn as_range(&self) -> PhysicalRange {
        PhysicalRange::new(self.start, self.end())
    }

    /// All managed pages, lowest first.
    #[inline]
    #[must_use]
    pub fn pages(&self) -> PhysicalPages<Size4K> {
        self.as_range().pages::<Size4K>()
    }

    /// Table index of the page starting at `pa`.
    ///
    /// # Errors
    /// Returns an [`AddressError`] if `pa` is not the base of a managed page.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index_of(&self, pa: PhysicalAddress) -> Result<usize, AddressError> {
        if !pa.is_aligned::<Size4K>() {
            return Err(AddressError::Misaligned(pa));
        }
        let Some(offset) = pa.checked_offset_from(self.start) else {
            return Err(AddressError::BelowRegion {
                pa,
                start: self.start,
            });
        };
        // The region was built from a `usize` page count, so any in-range index fits.
        let index = offset >> Size4K::SHIFT;
        if index >= self.pages as u64 {
            return Err(AddressError::AboveRegion {
                pa,
                end: self.end(),
            });
        }
        Ok(index as usize)
    }

    /// The managed page starting at `pa`.
    ///
    /// # Errors
    /// Returns an [`AddressError`] if `pa` is not the base of a managed page.
    pub fn page_of(&self, pa: PhysicalAddress) -> Result<PhysicalPage<Size4K>, AddressError> {
        self.index_of(pa)?;
        Ok(PhysicalPage::containing_address(pa))
    }

    /// The page at table index `index`.
    #[must_use]
    pub fn page_at(&self, index: usize) -> Option<PhysicalPage<Size4K>> {
        if index >= self.pages {
            return None;
        }
        let base = self.start + ((index as u64) << Size4K::SHIFT);
        Some(PhysicalPage::containing_address(base))
    }

    #[inline]
    #[must_use]
    pub const fn contains(&self, pa: PhysicalAddress) -> bool {
        self.index_of(pa).is_ok()
    }
}
