use kernel_memory_addresses::{PhysicalAddress, PhysicalRange};

/// Why an address does not name a page managed by the allocator.
///
/// Handing such an address to [`free`](crate::PageAllocator::free) or to the
/// [reference-count table](crate::RefCountTable) is a fatal caller bug; the
/// error only exists so the panic message says what went wrong.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("{0} is not page aligned")]
    Misaligned(PhysicalAddress),
    #[error("{pa} lies below the managed region starting at {start}")]
    BelowRegion {
        pa: PhysicalAddress,
        start: PhysicalAddress,
    },
    #[error("{pa} lies at or above the end of the managed region at {end}")]
    AboveRegion {
        pa: PhysicalAddress,
        end: PhysicalAddress,
    },
}

/// Configuration errors when setting up a [`PageAllocator`](crate::PageAllocator).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageAllocatorInitError {
    #[error("physical range ends at {end} before it starts at {start}")]
    InvertedRange {
        start: PhysicalAddress,
        end: PhysicalAddress,
    },
    #[error("physical range {0:?} holds more pages than can be indexed")]
    RangeTooLarge(PhysicalRange),
    #[error("physical range {0:?} cannot hold its own reference count table")]
    RangeTooSmall(PhysicalRange),
    #[error("reference count table holds {provided} slots but {required} pages are managed")]
    TableTooSmall { required: usize, provided: usize },
}
