use core::{
    cell::UnsafeCell,
    hint::spin_loop,
    mem::MaybeUninit,
    sync::atomic::{AtomicU8, Ordering},
};

const UNINIT: u8 = 0;
const INITING: u8 = 1;
const READY: u8 = 2;

/// A write-once cell for kernel-wide singletons set up during boot.
///
/// The first successful [`set`](Self::set) (or [`get_or_init`](Self::get_or_init))
/// publishes the value; every later attempt observes it. Concurrent
/// initializers spin until the winner has finished writing.
pub struct SyncOnceCell<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Default for SyncOnceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SyncOnceCell<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNINIT),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Returns `Some(&T)` if already initialized.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.state.load(Ordering::Acquire) == READY {
            // SAFETY: READY guarantees the write is done
            Some(unsafe { self.get_unchecked() })
        } else {
            None
        }
    }

    /// Stores `value` if the cell is empty.
    ///
    /// # Errors
    /// Hands `value` back if the cell was already initialized or another
    /// caller is initializing it right now.
    pub fn set(&self, value: T) -> Result<&T, T> {
        if !self.begin_init() {
            return Err(value);
        }
        Ok(unsafe { self.publish(value) })
    }

    /// Initialize at most once and return `&T`.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> &T {
        if let Some(v) = self.get() {
            return v;
        }

        if self.begin_init() {
            return unsafe { self.publish(init()) };
        }

        // Someone else is initializing; wait until READY
        while self.state.load(Ordering::Acquire) != READY {
            spin_loop();
        }
        // SAFETY: READY
        unsafe { self.get_unchecked() }
    }

    #[inline]
    fn begin_init(&self) -> bool {
        self.state
            .compare_exchange(UNINIT, INITING, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// # Safety
    /// Caller must have won [`begin_init`](Self::begin_init).
    unsafe fn publish(&self, value: T) -> &T {
        unsafe {
            (*self.value.get()).write(value);
        }
        // Publish value before marking READY
        self.state.store(READY, Ordering::Release);
        unsafe { self.get_unchecked() }
    }

    /// # Safety
    /// State must be READY (or the caller just published the value).
    #[inline]
    unsafe fn get_unchecked(&self) -> &T {
        unsafe { &*(*self.value.get()).as_ptr() }
    }
}

// Safety: shared after READY; initialization is single-writer.
unsafe impl<T: Sync + Send> Sync for SyncOnceCell<T> {}
unsafe impl<T: Send> Send for SyncOnceCell<T> {}
