//! Lock-free single-producer/single-consumer byte ring.
//!
//! One side usually runs in an interrupt handler and the other in a task.
//! Only the producer ever stores `head` and only the consumer ever stores
//! `tail`, so neither side needs a lock. One slot is always left unused so
//! that `head == tail` means empty and `next(head) == tail` means full.

use core::{
    cell::UnsafeCell,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Fixed-capacity circular byte buffer with `N - 1` usable slots.
///
/// `N` must be a power of two.
pub struct RingBuffer<const N: usize> {
    buf: UnsafeCell<[u8; N]>,
    /// Next slot to write. Stored only by the producer.
    head: AtomicUsize,
    /// Next slot to read. Stored only by the consumer.
    tail: AtomicUsize,
}

// Safety: a slot is written by the producer only while it lies outside
// `tail..head`, and published with a Release store of `head`. The consumer
// reads a slot only after observing it inside `tail..head` with an Acquire
// load, and gives it back with a Release store of `tail`.
unsafe impl<const N: usize> Sync for RingBuffer<N> {}
unsafe impl<const N: usize> Send for RingBuffer<N> {}

impl<const N: usize> RingBuffer<N> {
    const MASK: usize = N - 1;

    /// Create an empty ring.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "ring size must be a power of two");
        Self {
            buf: UnsafeCell::new([0; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Usable capacity (`N - 1`).
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Producer: append a byte. Returns false, dropping the byte, if full.
    pub fn push(&self, byte: u8) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) & Self::MASK;
        if next == self.tail.load(Ordering::Acquire) {
            return false;
        }

        // Safety: `head` is outside the readable region, see the Sync impl.
        unsafe { self.slot(head).write(byte) };
        self.head.store(next, Ordering::Release);
        true
    }

    /// Consumer: remove the oldest byte.
    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }

        // Safety: `tail` is inside the readable region, see the Sync impl.
        let byte = unsafe { self.slot(tail).read() };
        self.tail.store((tail + 1) & Self::MASK, Ordering::Release);
        Some(byte)
    }

    /// Consumer: discard everything currently queued.
    pub fn clear(&self) {
        let head = self.head.load(Ordering::Acquire);
        self.tail.store(head, Ordering::Release);
    }

    /// Number of queued bytes. Exact only from the producer or consumer side
    /// while the other side is idle; otherwise a snapshot.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) & Self::MASK
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Returns true if a push would fail.
    pub fn is_full(&self) -> bool {
        self.space_available() == 0
    }

    /// Free slots. From the producer side this never overestimates, since
    /// the consumer can only make more room.
    pub fn space_available(&self) -> usize {
        self.capacity() - self.len()
    }

    fn slot(&self, index: usize) -> *mut u8 {
        debug_assert!(index < N);
        // Safety: index is masked into bounds by every caller.
        unsafe { self.buf.get().cast::<u8>().add(index) }
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_fifo_order() {
        let ring = RingBuffer::<8>::new();
        for b in b"abc" {
            assert!(ring.push(*b));
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.pop(), Some(b'a'));
        assert_eq!(ring.pop(), Some(b'b'));
        assert!(ring.push(b'd'));
        assert_eq!(ring.pop(), Some(b'c'));
        assert_eq!(ring.pop(), Some(b'd'));
        assert_eq!(ring.pop(), None);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_full_ring_drops_without_corruption() {
        let ring = RingBuffer::<4>::new();
        assert_eq!(ring.capacity(), 3);
        assert!(ring.push(1));
        assert!(ring.push(2));
        assert!(ring.push(3));
        assert!(ring.is_full());
        assert!(!ring.push(4));
        assert_eq!(ring.space_available(), 0);

        let drained: Vec<u8> = core::iter::from_fn(|| ring.pop()).collect();
        assert_eq!(drained, [1, 2, 3]);
    }

    #[test]
    fn test_wraparound_keeps_order() {
        let ring = RingBuffer::<4>::new();
        let mut expected = 0u8;
        for i in 0..50u8 {
            assert!(ring.push(i));
            if i % 2 == 1 {
                while let Some(b) = ring.pop() {
                    assert_eq!(b, expected);
                    expected += 1;
                }
            }
        }
        assert_eq!(expected, 50);
    }

    #[test]
    fn test_clear_discards_pending() {
        let ring = RingBuffer::<16>::new();
        for b in 0..10 {
            ring.push(b);
        }
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.space_available(), 15);
        assert!(ring.push(42));
        assert_eq!(ring.pop(), Some(42));
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        static RING: RingBuffer<64> = RingBuffer::new();
        const COUNT: usize = 10_000;

        std::thread::scope(|s| {
            s.spawn(|| {
                let mut i = 0usize;
                while i < COUNT {
                    if RING.push(i as u8) {
                        i += 1;
                    } else {
                        std::thread::yield_now();
                    }
                }
            });

            let mut received = 0usize;
            while received < COUNT {
                match RING.pop() {
                    Some(b) => {
                        assert_eq!(b, received as u8);
                        received += 1;
                    }
                    None => std::thread::yield_now(),
                }
            }
        });
    }
}
