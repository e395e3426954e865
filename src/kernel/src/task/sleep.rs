//! Timer-based cooperative delay.

use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use ember_hal::Timer;

/// Future that completes once the timer passes a deadline.
///
/// There is no timer wheel: a pending `Sleep` re-queues its task, so the
/// executor keeps polling it while other tasks get their turn.
pub struct Sleep<'a, T: Timer + ?Sized> {
    timer: &'a T,
    deadline: u64,
}

/// Sleep for at least `us` microseconds of `timer` time.
pub fn sleep_us<T: Timer + ?Sized>(timer: &T, us: u64) -> Sleep<'_, T> {
    Sleep {
        timer,
        deadline: timer.current_ticks().saturating_add(us),
    }
}

impl<T: Timer + ?Sized> Sleep<'_, T> {
    /// Absolute deadline in timer ticks.
    pub fn deadline(&self) -> u64 {
        self.deadline
    }
}

impl<T: Timer + ?Sized> Future for Sleep<'_, T> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.timer.current_ticks() >= self.deadline {
            Poll::Ready(())
        } else {
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
