//! # Kernel Physical Page Allocation
//!
//! This crate owns every page of physical memory between the end of the
//! kernel image and the top of RAM. It hands out and takes back single 4 KiB
//! pages and keeps a reference count per page, so that one physical page can
//! be shared (e.g. by a copy-on-write fork) and is only reclaimed once its
//! last owner lets go.
//!
//! Everything else that needs memory sits on top of it: process creation,
//! page-table construction, pipe buffers, kernel stacks.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  PageAllocator                      │
//! │    • allocate / allocate_zeroed / free              │
//! │    • boot population through the free path          │
//! └──────────────┬──────────────────────┬───────────────┘
//!                │ kmem lock            │ refs lock
//! ┌──────────────▼──────────┐ ┌─────────▼───────────────┐
//! │       Free List         │ │   Reference-Count Table │
//! │  • intrusive LIFO       │ │  • one u32 per page     │
//! │  • link lives in page   │ │  • set/inc/dec/get      │
//! └──────────────┬──────────┘ └─────────┬───────────────┘
//!                │                      │
//! ┌──────────────▼──────────┐ ┌─────────▼───────────────┐
//! │       PhysMapper        │ │       PageRegion        │
//! │  • PA → pointer         │ │  • PA → table index     │
//! └─────────────────────────┘ └─────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! ### Page Allocator ([`PageAllocator`])
//!
//! * [`allocate`](PageAllocator::allocate) pops a free page, sets its count to
//!   1 and fills it with [`ALLOC_JUNK`](kernel_info::memory::ALLOC_JUNK).
//!   Running out of pages yields `None`; it is not an error.
//! * [`free`](PageAllocator::free) validates the address, drops one reference
//!   and, at zero, fills the page with [`FREE_JUNK`](kernel_info::memory::FREE_JUNK)
//!   and pushes it back. A misaligned or out-of-range address halts the
//!   kernel.
//!
//! ### Reference-Count Table ([`RefCountTable`])
//!
//! Exposed through [`PageAllocator::ref_counts`] so a copy-on-write layer can
//! share a page ([`increment`](RefCountTable::increment)) without duplicating
//! the allocator's bookkeeping.
//!
//! ### Boot ([`boot`]) and the global slot ([`global`])
//!
//! [`boot::init_from_layout`] takes the [`MemoryLayout`](kernel_info::memory::MemoryLayout),
//! places the reference-count table in the first pages above the kernel and
//! populates the allocator with the rest. [`global::init`] does the same and
//! publishes the result for code that cannot be handed a reference.
//!
//! ## Concurrency
//!
//! The free list and the table each have their own spinlock and no code path
//! holds both at the same time, so there is no lock ordering to get wrong.
//! Operations on one page's count are strictly serialized; nothing else is
//! ordered.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kernel_alloc::{HhdmPhysMapper, global};
//! use kernel_info::memory::MemoryLayout;
//!
//! let layout = MemoryLayout::with_kernel_end(kernel_end);
//! let kmem = unsafe { global::init(&layout, HhdmPhysMapper::identity()) }?;
//!
//! let page = kmem.allocate().ok_or(Error::OutOfMemory)?;
//! kmem.ref_counts().increment(page); // second owner, e.g. after fork
//! unsafe {
//!     kmem.free(page); // first owner done, page stays allocated
//!     kmem.free(page); // last owner done, page is back on the free list
//! }
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod boot;
mod error;
mod free_list;
pub mod global;
mod page_allocator;
mod phys_mapper;
mod ref_count;
mod region;

pub use error::{AddressError, PageAllocatorInitError};
pub use page_allocator::{PageAllocator, PageAllocatorStats};
pub use phys_mapper::{HhdmPhysMapper, PhysMapper};
pub use ref_count::{RefCount, RefCountTable};
pub use region::PageRegion;
