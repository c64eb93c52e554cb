use crate::phys_mapper::PhysMapper;
use core::ptr;
use kernel_memory_addresses::{PhysicalPage, Size4K};

/// Header stored at the beginning of every **free** page.
///
/// A free page in memory has the following layout:
///
/// ```text
/// +----------------------+----------------------------------+
/// | FreePage (link)      |  junk (rest of the 4 KiB page)   |
/// +----------------------+----------------------------------+
/// ^ page base
/// ```
///
/// The link is the only bookkeeping a free page carries; it is overwritten as
/// soon as the page is handed out again.
struct FreePage {
    /// Next free page (or `None` at the tail).
    next: Option<PhysicalPage<Size4K>>,
}

/// Intrusive LIFO list of free 4 KiB pages.
///
/// The list owns every page on it. Nothing but the list may read or write a
/// listed page, which is what makes storing the link inside the page sound.
///
/// # Invariants
/// - Every listed page is managed by the owning allocator and mapped by the
///   [`PhysMapper`] passed to [`push`](Self::push) and [`pop`](Self::pop).
/// - `len` equals the number of pages reachable from `head`.
pub(crate) struct FreeList {
    head: Option<PhysicalPage<Size4K>>,
    len: usize,
}

impl FreeList {
    pub(crate) const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Pushes `page` onto the head of the list.
    ///
    /// # Safety
    /// - `page` must be exclusively owned by the caller and not already listed.
    /// - `mapper` must map `page` to writable memory.
    /// - Must only be called while holding the list's lock.
    pub(crate) unsafe fn push<M: PhysMapper>(&mut self, mapper: &M, page: PhysicalPage<Size4K>) {
        let link = mapper.phys_to_ptr::<FreePage>(page.base());
        unsafe {
            ptr::write(link, FreePage { next: self.head });
        }
        self.head = Some(page);
        self.len += 1;
    }

    /// Unlinks the head page and transfers its ownership to the caller.
    ///
    /// # Safety
    /// - `mapper` must be the mapper used to [`push`](Self::push) the pages.
    /// - Must only be called while holding the list's lock.
    pub(crate) unsafe fn pop<M: PhysMapper>(&mut self, mapper: &M) -> Option<PhysicalPage<Size4K>> {
        let page = self.head?;
        let link = mapper.phys_to_ptr::<FreePage>(page.base());
        self.head = unsafe { ptr::read(link) }.next;
        self.len -= 1;
        Some(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HhdmPhysMapper;
    use kernel_memory_addresses::{PageSize, PhysicalAddress};

    const A: u64 = 0x8000_0000;

    #[repr(C, align(4096))]
    struct Pages([[u8; 4096]; 3]);

    fn page(i: u64) -> PhysicalPage<Size4K> {
        PhysicalPage::containing_address(PhysicalAddress::new(A + i * Size4K::SIZE))
    }

    #[test]
    fn pops_in_reverse_push_order() {
        let mut memory = Box::new(Pages([[0; 4096]; 3]));
        let host = (&raw mut *memory).expose_provenance() as u64;
        let mapper = HhdmPhysMapper::new(host.wrapping_sub(A));

        let mut list = FreeList::new();
        unsafe {
            assert_eq!(list.pop(&mapper), None);
            for i in 0..3 {
                list.push(&mapper, page(i));
            }
            assert_eq!(list.len(), 3);
            assert_eq!(list.pop(&mapper), Some(page(2)));
            assert_eq!(list.pop(&mapper), Some(page(1)));
            list.push(&mapper, page(2));
            assert_eq!(list.pop(&mapper), Some(page(2)));
            assert_eq!(list.pop(&mapper), Some(page(0)));
            assert_eq!(list.pop(&mapper), None);
        }
        assert_eq!(list.len(), 0);
        drop(memory);
    }
}
