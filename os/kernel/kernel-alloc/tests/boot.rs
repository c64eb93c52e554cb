mod support;

use kernel_alloc::PageAllocatorInitError;
use kernel_alloc::boot::{init_from_layout, table_pages};
use kernel_info::memory::MemoryLayout;
use kernel_memory_addresses::PhysicalAddress;
use support::{A, Arena, PAGE};

fn pa(addr: u64) -> PhysicalAddress {
    PhysicalAddress::new(addr)
}

#[test]
fn table_page_counts() {
    assert_eq!(table_pages(0), 0);
    assert_eq!(table_pages(1), 1);
    assert_eq!(table_pages(1024), 1);
    assert_eq!(table_pages(1025), 2);
    // the reference board: 128 MiB of 4 KiB pages
    assert_eq!(table_pages(32_768), 32);
}

#[test]
fn table_is_carved_from_the_first_whole_page() {
    let arena = Arena::new(A, 40);
    // The kernel image ends mid-page; that page is not ours.
    arena.scribble(pa(A + PAGE), 0xFF);
    let layout = MemoryLayout::new(pa(A + 0x123), pa(A + 40 * PAGE));

    let alloc = unsafe { init_from_layout(&layout, arena.mapper()) }.unwrap();

    // 39 whole pages, one of which holds the table.
    assert_eq!(alloc.region().start(), pa(A + 2 * PAGE));
    assert_eq!(alloc.region().len(), 38);
    assert_eq!(alloc.region().end(), pa(A + 40 * PAGE));
    let stats = alloc.stats();
    assert_eq!(stats.total_pages, 38);
    assert_eq!(stats.free_pages, 38);
    assert!(!alloc.contains(pa(A + PAGE)));

    // Every counter lives in the table page and starts out at zero.
    let slots = 38 * 4;
    assert!(arena.page(pa(A + PAGE))[..slots].iter().all(|&b| b == 0));
    assert!(arena.page(pa(A + PAGE))[slots..].iter().all(|&b| b == 0xFF));

    // The free list is LIFO: the highest page comes out first, index 37.
    let page = alloc.allocate().unwrap();
    assert_eq!(page.base(), pa(A + 39 * PAGE));
    let table = arena.page(pa(A + PAGE));
    assert_eq!(&table[37 * 4..38 * 4], &1u32.to_ne_bytes());

    alloc.ref_counts().increment(page);
    let table = arena.page(pa(A + PAGE));
    assert_eq!(&table[37 * 4..38 * 4], &2u32.to_ne_bytes());
}

#[test]
#[should_panic(expected = "below the managed region")]
fn table_pages_cannot_be_freed() {
    let arena = Arena::new(A, 8);
    let layout = MemoryLayout::new(pa(A), pa(A + 8 * PAGE));
    let alloc = unsafe { init_from_layout(&layout, arena.mapper()) }.unwrap();
    assert_eq!(alloc.region().start(), pa(A + PAGE));

    unsafe { alloc.free(pa(A)) };
}

#[test]
fn layout_without_room_for_pages_is_rejected() {
    let arena = Arena::new(A, 1);

    // One page is just enough for the table.
    let layout = MemoryLayout::new(pa(A), pa(A + PAGE));
    let err = unsafe { init_from_layout(&layout, arena.mapper()) }.unwrap_err();
    assert_eq!(err, PageAllocatorInitError::RangeTooSmall(layout.allocatable()));

    // No whole page at all.
    let layout = MemoryLayout::new(pa(A + 0x10), pa(A + 0xFF0));
    let err = unsafe { init_from_layout(&layout, arena.mapper()) }.unwrap_err();
    assert_eq!(err, PageAllocatorInitError::RangeTooSmall(layout.allocatable()));
}

#[test]
fn inverted_layout_is_rejected() {
    let arena = Arena::new(A, 1);
    let layout = MemoryLayout::new(pa(A + PAGE), pa(A));
    let err = unsafe { init_from_layout(&layout, arena.mapper()) }.unwrap_err();
    assert_eq!(
        err,
        PageAllocatorInitError::InvertedRange {
            start: pa(A + PAGE),
            end: pa(A),
        }
    );
}

#[test]
fn carved_allocator_hands_out_every_managed_page() {
    let arena = Arena::new(A, 16);
    let layout = MemoryLayout::new(pa(A), pa(A + 16 * PAGE));
    let alloc = unsafe { init_from_layout(&layout, arena.mapper()) }.unwrap();

    let mut pages: Vec<_> = std::iter::from_fn(|| alloc.allocate()).map(|p| p.base()).collect();
    pages.sort_unstable();
    let expected: Vec<_> = (1..16).map(|i| pa(A + i * PAGE)).collect();
    assert_eq!(pages, expected);

    for page in pages {
        unsafe { alloc.free(page) };
    }
    assert_eq!(alloc.stats().free_pages, 15);
}
