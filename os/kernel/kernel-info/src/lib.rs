//! # Kernel Memory Configuration
//!
//! This crate is the single source of truth for the physical memory layout
//! constants the page allocator is configured with. It carries no code paths
//! of its own beyond small `const` helpers.
//!
//! ## Physical Memory Layout
//!
//! ```text
//! Physical Memory Layout (reference board):
//! KERNEL_BASE  ┌─────────────────────────────────┐ 0x8000_0000
//!              │       Kernel Image              │
//!              │   (Text, Data, BSS)             │
//! kernel_end   ├─────────────────────────────────┤ (linker symbol `end`)
//!              │    Available RAM                │
//!              │  (Managed by the page allocator)│
//! PHYS_TOP     └─────────────────────────────────┘ 0x8800_0000
//! ```
//!
//! The end of the kernel image is only known at link time, so it enters the
//! [`MemoryLayout`](memory::MemoryLayout) at runtime; the top of physical
//! memory defaults to [`PHYS_TOP`](memory::PHYS_TOP).
//!
//! ## Junk Patterns
//!
//! The allocator overwrites pages with [`ALLOC_JUNK`](memory::ALLOC_JUNK) when
//! handing them out and with [`FREE_JUNK`](memory::FREE_JUNK) when taking them
//! back, so reads of uninitialized or released memory are easy to spot in a
//! memory dump.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
