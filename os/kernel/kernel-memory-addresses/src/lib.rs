//! # Physical Memory Address Types
//!
//! Strongly typed wrappers for physical addresses, page bases and address
//! ranges used by the kernel's physical page allocator.
//!
//! ## Overview
//!
//! | Type | Generic | Description |
//! |------|---------|-------------|
//! | [`PhysicalAddress`] | – | A raw 64-bit physical address. |
//! | [`PhysicalPage<S>`] | [`S: PageSize`](PageSize) | The page-aligned base of a page of size `S`. |
//! | [`PhysicalRange`] | – | A half-open `[start, end)` range of physical addresses. |
//!
//! ## Page Sizes
//!
//! The allocator deals exclusively in 4 KiB pages, represented by the
//! [`Size4K`] marker. The [`PageSize`] trait carries the build-time
//! constants [`SIZE`](PageSize::SIZE), [`SHIFT`](PageSize::SHIFT) and
//! [`MASK`](PageSize::MASK).
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let kernel_end = PhysicalAddress::new(0x8002_1234);
//! let phys_top = PhysicalAddress::new(0x8800_0000);
//! let range = PhysicalRange::new(kernel_end, phys_top);
//!
//! let first = range.pages::<Size4K>().next().unwrap();
//! assert_eq!(first.base().as_u64(), 0x8002_2000);
//! assert!(first.base().is_aligned::<Size4K>());
//! ```
//!
//! ## Design Notes
//!
//! - The types are `#[repr(transparent)]` and implement `Copy`, `Eq`, `Ord`, and
//!   `Hash`, making them suitable as map keys.
//! - Arithmetic that can overflow the 64-bit address space is exposed as
//!   `checked_*` / `Option`-returning helpers instead of wrapping silently.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod page_size;
mod physical_address;
mod physical_page;
mod physical_range;

pub use page_size::{PageSize, Size4K};
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
pub use physical_range::{PhysicalPages, PhysicalRange};
