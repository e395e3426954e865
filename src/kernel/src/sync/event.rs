//! Interrupt-to-task wake signal.

use core::{
    future::Future,
    pin::Pin,
    sync::atomic::{AtomicBool, Ordering},
    task::{Context, Poll},
};
use futures_util::task::AtomicWaker;

/// A single-waiter event flag.
///
/// Interrupt handlers call [`Event::signal`]; one task awaits
/// [`Event::wait`]. Signals raised while nobody waits are latched, and
/// several signals before the waiter runs collapse into one wake.
pub struct Event {
    pending: AtomicBool,
    waker: AtomicWaker,
}

impl Event {
    /// Create a cleared event.
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            waker: AtomicWaker::new(),
        }
    }

    /// Latch the event and wake the waiting task, if any. Safe from ISRs.
    pub fn signal(&self) {
        self.pending.store(true, Ordering::Release);
        self.waker.wake();
    }

    /// Consume a latched signal without waiting.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Returns true if a signal is latched.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Wait until the event is signalled, consuming the signal.
    pub fn wait(&self) -> EventWait<'_> {
        EventWait { event: self }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`Event::wait`].
pub struct EventWait<'a> {
    event: &'a Event,
}

impl Future for EventWait<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        // fast path
        if self.event.take() {
            return Poll::Ready(());
        }

        self.event.waker.register(cx.waker());
        if self.event.take() {
            self.event.waker.take();
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{block_on, poll_once};

    #[test]
    fn test_signal_before_wait_is_latched() {
        let event = Event::new();
        event.signal();
        event.signal();
        assert!(event.is_pending());
        block_on(event.wait());
        assert!(!event.is_pending());
    }

    #[test]
    fn test_wait_pends_until_signalled() {
        let event = Event::new();
        let mut wait = core::pin::pin!(event.wait());
        assert!(poll_once(wait.as_mut()).is_pending());
        event.signal();
        assert!(poll_once(wait.as_mut()).is_ready());
    }

    #[test]
    fn test_take_clears() {
        let event = Event::new();
        assert!(!event.take());
        event.signal();
        assert!(event.take());
        assert!(!event.take());
    }
}
