//! Cooperative task runtime.
//!
//! Tasks never preempt each other. Interrupt handlers only wake tasks
//! through [`crate::sync::Event`] or queue wakers; everything else runs
//! from [`executor::Executor`].

use alloc::boxed::Box;
use core::{
    future::Future,
    pin::Pin,
    sync::atomic::{AtomicU64, Ordering},
    task::{Context, Poll},
};

pub mod executor;
mod sleep;

pub use sleep::{sleep_us, Sleep};

/// Yields execution to allow other tasks to run.
///
/// Returns `Pending` once, wakes itself, then returns `Ready`.
pub async fn yield_now() {
    YieldNow { yielded: false }.await
}

struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// A unique identifier for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        TaskId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Task priority levels. Higher priorities drain first on every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Housekeeping (console).
    Low = 0,
    /// Standard priority.
    Normal = 1,
    /// Latency-sensitive work (keyboard scan, host port).
    High = 2,
}

impl Priority {
    /// Number of priority levels.
    pub const COUNT: usize = 3;
}

/// A spawned future plus its scheduling metadata.
pub struct Task {
    id: TaskId,
    name: &'static str,
    priority: Priority,
    future: Pin<Box<dyn Future<Output = ()>>>,
}

impl Task {
    /// Create a task with Normal priority.
    pub fn new(name: &'static str, future: impl Future<Output = ()> + 'static) -> Task {
        Self::with_priority(name, future, Priority::Normal)
    }

    /// Create a task with a specific priority.
    pub fn with_priority(
        name: &'static str,
        future: impl Future<Output = ()> + 'static,
        priority: Priority,
    ) -> Task {
        Task {
            id: TaskId::new(),
            name,
            priority,
            future: Box::pin(future),
        }
    }

    /// Task identifier.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Name used in log messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn poll(&mut self, context: &mut Context) -> Poll<()> {
        self.future.as_mut().poll(context)
    }
}
