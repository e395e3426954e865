//! Async-aware mutex for state shared between cooperative tasks.
//!
//! The keyboard controller is driven by both the host-port task and the
//! console (`ctrlram`, `codeset`), so it lives behind one of these.

use core::{
    cell::UnsafeCell,
    future::Future,
    ops::{Deref, DerefMut},
    pin::Pin,
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
    task::{Context, Poll, Waker},
};
use crossbeam_queue::ArrayQueue;

/// Maximum number of tasks parked on one mutex. The EC runs a handful of
/// tasks, so this is never reached in practice.
const MAX_WAITERS: usize = 8;

/// A mutex whose `lock` yields to the executor instead of spinning.
pub struct AsyncMutex<T> {
    data: UnsafeCell<T>,
    locked: AtomicBool,
    /// Parked tasks. Entries may be stale; every unlock wakes them all.
    waiters: ArrayQueue<Waker>,
    /// Bumped by every unlock, so a parked future knows its entry is gone.
    unlocks: AtomicU32,
}

// Safety: access to `data` is only handed out through a guard, and at most
// one guard exists at a time thanks to the `locked` compare-exchange.
unsafe impl<T: Send> Send for AsyncMutex<T> {}
unsafe impl<T: Send> Sync for AsyncMutex<T> {}

impl<T> AsyncMutex<T> {
    /// Create an unlocked mutex.
    pub fn new(data: T) -> Self {
        Self {
            data: UnsafeCell::new(data),
            locked: AtomicBool::new(false),
            waiters: ArrayQueue::new(MAX_WAITERS),
            unlocks: AtomicU32::new(0),
        }
    }

    fn try_acquire(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Acquire the lock if it is free.
    pub fn try_lock(&self) -> Option<AsyncMutexGuard<'_, T>> {
        self.try_acquire().then_some(AsyncMutexGuard { mutex: self })
    }

    /// Acquire the lock, yielding while another task holds it.
    pub fn lock(&self) -> AsyncMutexLockFuture<'_, T> {
        AsyncMutexLockFuture {
            mutex: self,
            registered: None,
        }
    }

    /// Returns true if some guard is alive.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
        self.unlocks.fetch_add(1, Ordering::AcqRel);
        // Losers of the race re-register when polled.
        while let Some(waker) = self.waiters.pop() {
            waker.wake();
        }
    }

    #[cfg(test)]
    fn parked(&self) -> usize {
        self.waiters.len()
    }
}

/// RAII guard; the lock is released on drop.
pub struct AsyncMutexGuard<'a, T> {
    mutex: &'a AsyncMutex<T>,
}

impl<T> Deref for AsyncMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Safety: the guard proves exclusive access.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for AsyncMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Safety: the guard proves exclusive access.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T> Drop for AsyncMutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

/// Future returned by [`AsyncMutex::lock`].
pub struct AsyncMutexLockFuture<'a, T> {
    mutex: &'a AsyncMutex<T>,
    /// Unlock count when our waker was queued.
    registered: Option<u32>,
}

impl<'a, T> Future for AsyncMutexLockFuture<'a, T> {
    type Output = AsyncMutexGuard<'a, T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let mutex = this.mutex;
        if mutex.try_acquire() {
            return Poll::Ready(AsyncMutexGuard { mutex });
        }

        // Still queued if nobody unlocked since we registered.
        let unlocks = mutex.unlocks.load(Ordering::Acquire);
        if this.registered != Some(unlocks) {
            if mutex.waiters.push(cx.waker().clone()).is_err() {
                // Parking lot full: retry on the next executor pass instead.
                log::warn!("mutex waiter queue full");
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
            this.registered = Some(unlocks);
        }

        // The holder may have unlocked between the first attempt and the
        // push, in which case nobody would wake us.
        if mutex.try_acquire() {
            return Poll::Ready(AsyncMutexGuard { mutex });
        }

        Poll::Pending
    }
}
