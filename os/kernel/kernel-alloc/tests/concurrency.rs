mod support;

use kernel_alloc::{PageAllocator, RefCount};
use kernel_memory_addresses::PhysicalAddress;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Barrier, Mutex};
use std::thread;
use support::{A, Arena};

#[test]
fn no_page_is_handed_out_twice() {
    const PAGES: usize = 32;
    let threads = 8;
    let iters = 2_000;

    let arena = Arena::new(A, PAGES);
    let mut slots: Vec<RefCount> = vec![0; PAGES];
    let alloc = unsafe { PageAllocator::new(arena.range(), &mut slots, arena.mapper()) }.unwrap();

    let live: Mutex<HashSet<PhysicalAddress>> = Mutex::new(HashSet::new());
    let exhausted = AtomicUsize::new(0);
    let start = Barrier::new(threads);

    thread::scope(|s| {
        for t in 0..threads {
            let (alloc, live, exhausted, start, arena) = (&alloc, &live, &exhausted, &start, &arena);
            s.spawn(move || {
                start.wait();
                let mut held = Vec::new();
                for i in 0..iters {
                    if i % 4 != 3 {
                        match alloc.allocate() {
                            Some(page) => {
                                let fresh = live.lock().unwrap().insert(page.base());
                                assert!(fresh, "{page} handed out twice");
                                assert_eq!(alloc.ref_counts().get(page), 1);
                                #[allow(clippy::cast_possible_truncation)]
                                arena.scribble(page, t as u8);
                                held.push(page);
                            }
                            None => {
                                exhausted.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    } else if let Some(page) = held.pop() {
                        // Our scribble survived: nobody else wrote to our page.
                        #[allow(clippy::cast_possible_truncation)]
                        let mine = t as u8;
                        assert!(arena.page(page).iter().all(|&b| b == mine));
                        assert!(live.lock().unwrap().remove(&page.base()));
                        unsafe { alloc.free(page) };
                    }
                    thread::yield_now();
                }
                for page in held {
                    assert!(live.lock().unwrap().remove(&page.base()));
                    unsafe { alloc.free(page) };
                }
            });
        }
    });

    assert!(live.lock().unwrap().is_empty());
    // Threads keep more pages than they release, so the pool must run dry.
    assert!(exhausted.load(Ordering::Relaxed) > 0);
    let stats = alloc.stats();
    assert_eq!(stats.free_pages, PAGES);
    assert_eq!(stats.allocated_pages(), 0);
}

#[test]
fn concurrent_releases_of_a_shared_page_reclaim_it_once() {
    let owners = 8;
    let rounds = 200;

    let arena = Arena::new(A, 4);
    let mut slots: Vec<RefCount> = vec![0; 4];
    let alloc = unsafe { PageAllocator::new(arena.range(), &mut slots, arena.mapper()) }.unwrap();

    for _ in 0..rounds {
        let page = alloc.allocate().unwrap();
        for _ in 1..owners {
            alloc.ref_counts().increment(page);
        }
        assert_eq!(alloc.ref_counts().get(page), u32::try_from(owners).unwrap());

        let start = Barrier::new(owners);
        thread::scope(|s| {
            for _ in 0..owners {
                s.spawn(|| {
                    start.wait();
                    unsafe { alloc.free(page) };
                });
            }
        });

        let stats = alloc.stats();
        assert_eq!(stats.free_pages, stats.total_pages, "page lost or listed twice");
    }

    // Every page is still obtainable exactly once.
    let distinct: HashSet<_> = std::iter::from_fn(|| alloc.allocate()).collect();
    assert_eq!(distinct.len(), 4);
}

#[test]
fn sharing_races_with_allocation_traffic() {
    let threads = 4;
    let iters = 1_000;

    let arena = Arena::new(A, 16);
    let mut slots: Vec<RefCount> = vec![0; 16];
    let alloc = unsafe { PageAllocator::new(arena.range(), &mut slots, arena.mapper()) }.unwrap();

    let pinned = alloc.allocate().unwrap();

    thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                for _ in 0..iters {
                    // share and drop the pinned page while others churn the pool
                    alloc.ref_counts().increment(pinned);
                    if let Some(page) = alloc.allocate() {
                        assert_ne!(page, pinned);
                        unsafe { alloc.free(page) };
                    }
                    unsafe { alloc.free(pinned) };
                }
            });
        }
    });

    assert_eq!(alloc.ref_counts().get(pinned), 1);
    assert_eq!(alloc.stats().allocated_pages(), 1);
}
