//! Synchronization primitives shared between interrupt handlers and tasks.
//!
//! - [`RingBuffer`]: lock-free SPSC byte ring for ISR/task byte streams
//! - [`Event`]: latched wake signal raised from interrupt context
//! - [`AsyncMutex`]: exclusive lock that yields to the executor when contended
//!
//! Interrupt handlers only ever push into a ring or signal an event. All
//! interpretation happens in task context.

mod event;
mod mutex;
mod ring;

pub use event::{Event, EventWait};
pub use mutex::{AsyncMutex, AsyncMutexGuard, AsyncMutexLockFuture};
pub use ring::RingBuffer;
