//! # Kernel-wide page allocator
//!
//! Subsystems that cannot be handed a [`PageAllocator`] reference (trap
//! handlers, early architecture code) reach the boot-time instance through
//! [`page_allocator`]. The slot is written exactly once by [`init`].

use crate::boot;
use crate::error::PageAllocatorInitError;
use crate::page_allocator::PageAllocator;
use crate::phys_mapper::HhdmPhysMapper;
use core::sync::atomic::{AtomicBool, Ordering};
use kernel_info::memory::MemoryLayout;
use kernel_sync::SyncOnceCell;

/// The allocator type living in the global slot.
pub type KernelPageAllocator = PageAllocator<'static, HhdmPhysMapper>;

static PAGE_ALLOCATOR: SyncOnceCell<KernelPageAllocator> = SyncOnceCell::new();

/// Set by the first [`init`] so a racing second call never touches the RAM.
static CLAIMED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GlobalInitError {
    #[error("the kernel page allocator is already initialized")]
    AlreadyInitialized,
    #[error(transparent)]
    Init(#[from] PageAllocatorInitError),
}

/// Builds the kernel's page allocator over `layout` and publishes it.
///
/// # Errors
/// - [`GlobalInitError::AlreadyInitialized`] on every call after the first
///   successful one.
/// - [`GlobalInitError::Init`] if the layout is unusable; `init` may then be
///   retried with a different layout.
///
/// # Safety
/// Same contract as [`boot::init_from_layout`].
pub unsafe fn init(
    layout: &MemoryLayout,
    mapper: HhdmPhysMapper,
) -> Result<&'static KernelPageAllocator, GlobalInitError> {
    if CLAIMED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return Err(GlobalInitError::AlreadyInitialized);
    }

    let allocator = match unsafe { boot::init_from_layout(layout, mapper) } {
        Ok(allocator) => allocator,
        Err(e) => {
            CLAIMED.store(false, Ordering::Release);
            return Err(e.into());
        }
    };

    PAGE_ALLOCATOR
        .set(allocator)
        .map_err(|_| GlobalInitError::AlreadyInitialized)
}

/// The kernel's page allocator, once [`init`] has succeeded.
#[must_use]
pub fn page_allocator() -> Option<&'static KernelPageAllocator> {
    PAGE_ALLOCATOR.get()
}
