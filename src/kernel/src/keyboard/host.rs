//! Plumbing between the host bus, the i8042 controller and the host port.
//!
//! The host bus interrupt only queues what the host wrote
//! ([`HostInput::receive`]) and drains what is ready for it
//! ([`QueuedHostPort::pop_for_host`]). The controller itself runs in
//! [`host_task`].

use super::i8042::I8042;
use crate::{
    config::{HOST_INPUT_QUEUE_SIZE, HOST_QUEUE_SIZE},
    console::KeyboardAccess,
    sync::AsyncMutex,
};
use core::{
    pin::Pin,
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
    task::{Context, Poll},
};
use crossbeam_queue::ArrayQueue;
use ember_common::{EcError, EcResult};
use ember_hal::HostKeyboardPort;
use futures_util::{
    stream::{Stream, StreamExt},
    task::AtomicWaker,
};
use log::{trace, warn};

/// One byte written by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostWrite {
    /// Written to the data port (0x60).
    Data(u8),
    /// Written to the command port (0x64).
    Command(u8),
}

/// Host writes waiting for the controller task.
pub struct HostInput {
    queue: ArrayQueue<HostWrite>,
    waker: AtomicWaker,
    dropped: AtomicU32,
}

impl HostInput {
    /// Create an empty input queue.
    pub fn new() -> Self {
        Self {
            queue: ArrayQueue::new(HOST_INPUT_QUEUE_SIZE),
            waker: AtomicWaker::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Called by the host bus interrupt handler. Returns false if the write
    /// was dropped.
    ///
    /// Must not log: drops are counted and reported by [`host_task`].
    pub fn receive(&self, write: HostWrite) -> bool {
        if self.queue.push(write).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.waker.wake();
        true
    }

    /// Host writes lost because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stream of host writes, in arrival order.
    pub fn stream(&self) -> HostWriteStream<'_> {
        HostWriteStream { input: self }
    }
}

impl Default for HostInput {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream returned by [`HostInput::stream`]. Never ends.
pub struct HostWriteStream<'a> {
    input: &'a HostInput,
}

impl Stream for HostWriteStream<'_> {
    type Item = HostWrite;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<HostWrite>> {
        let input = self.input;

        // fast path
        if let Some(write) = input.queue.pop() {
            return Poll::Ready(Some(write));
        }

        input.waker.register(cx.waker());
        match input.queue.pop() {
            Some(write) => {
                input.waker.take();
                Poll::Ready(Some(write))
            }
            None => Poll::Pending,
        }
    }
}

/// Host port backed by a bounded byte queue.
///
/// Bytes are queued by task code through [`HostKeyboardPort`] and taken by
/// the host bus interrupt with [`QueuedHostPort::pop_for_host`].
pub struct QueuedHostPort {
    queue: ArrayQueue<u8>,
    irq_enabled: AtomicBool,
}

impl QueuedHostPort {
    /// Create an empty port with the keyboard IRQ off.
    pub fn new() -> Self {
        Self {
            queue: ArrayQueue::new(HOST_QUEUE_SIZE),
            irq_enabled: AtomicBool::new(false),
        }
    }

    /// Next byte for the host to read.
    pub fn pop_for_host(&self) -> Option<u8> {
        self.queue.pop()
    }

    /// Bytes waiting for the host.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether the host wants an IRQ when data is available.
    pub fn irq_enabled(&self) -> bool {
        self.irq_enabled.load(Ordering::Acquire)
    }
}

impl Default for QueuedHostPort {
    fn default() -> Self {
        Self::new()
    }
}

impl HostKeyboardPort for &QueuedHostPort {
    /// All or nothing: a partial scan code would desync the host decoder.
    fn send_to_host(&mut self, bytes: &[u8]) -> bool {
        if self.queue.capacity() - self.queue.len() < bytes.len() {
            return false;
        }
        for &b in bytes {
            if self.queue.push(b).is_err() {
                return false;
            }
        }
        trace!("to host {:02x?}", bytes);
        true
    }

    fn enable_keyboard_irq(&mut self) {
        self.irq_enabled.store(true, Ordering::Release);
    }

    fn disable_keyboard_irq(&mut self) {
        self.irq_enabled.store(false, Ordering::Release);
    }

    fn flush(&mut self) {
        while self.queue.pop().is_some() {}
    }
}

/// The emulated keyboard: controller state plus the port it answers on.
pub struct HostKeyboard<P> {
    /// Controller state.
    pub i8042: I8042,
    /// Host-facing port.
    pub port: P,
}

impl<P: HostKeyboardPort> HostKeyboard<P> {
    /// Power-on controller attached to `port`.
    pub fn new(port: P) -> Self {
        Self {
            i8042: I8042::new(),
            port,
        }
    }

    /// Run one host write through the controller and send the reply.
    pub fn handle(&mut self, write: HostWrite) -> EcResult<()> {
        let response = match write {
            HostWrite::Data(b) => self.i8042.handle_data(b, &mut self.port),
            HostWrite::Command(b) => self.i8042.handle_command(b, &mut self.port),
        };
        if response.is_empty() {
            return Ok(());
        }
        if !self.port.send_to_host(&response) {
            warn!("host queue full; dropping reply {:?}", response);
            return Err(EcError::BufferFull);
        }
        Ok(())
    }

    /// Borrow the controller and port for a console command.
    pub fn access(&mut self) -> KeyboardAccess<'_> {
        KeyboardAccess {
            i8042: &mut self.i8042,
            port: &mut self.port,
        }
    }

    /// Forward a matrix key transition to the host.
    ///
    /// Ignored while the keyboard is disabled. Positions with no key are
    /// `Err(Unimplemented)`; a full host queue is `Err(BufferFull)`.
    pub fn key_state_changed(&mut self, row: usize, col: usize, pressed: bool) -> EcResult<()> {
        if !self.i8042.is_keyboard_enabled() {
            trace!("keyboard disabled, ignoring ({}, {})", row, col);
            return Ok(());
        }
        let code = self.i8042.translate(row, col, pressed)?;
        if !self.port.send_to_host(&code) {
            return Err(EcError::BufferFull);
        }
        Ok(())
    }
}

/// Runs the controller on every host write, forever.
pub async fn host_task<P: HostKeyboardPort>(
    input: &HostInput,
    keyboard: &AsyncMutex<HostKeyboard<P>>,
) {
    let mut writes = input.stream();
    let mut reported = 0;
    while let Some(write) = writes.next().await {
        let dropped = input.dropped();
        if dropped != reported {
            warn!("host input overrun, {} writes lost", dropped.wrapping_sub(reported));
            reported = dropped;
        }
        // Errors are already logged; the host will retry.
        let _ = keyboard.lock().await.handle(write);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{poll_once, MockHostPort};
    use core::pin::pin;

    #[test]
    fn test_queued_port_is_all_or_nothing() {
        let port = QueuedHostPort::new();
        let mut p = &port;
        let filler = [0u8; HOST_QUEUE_SIZE - 2];
        assert!(p.send_to_host(&filler));
        assert!(!p.send_to_host(&[1, 2, 3]));
        assert_eq!(port.pending(), HOST_QUEUE_SIZE - 2);
        assert!(p.send_to_host(&[1, 2]));
        assert_eq!(port.pending(), HOST_QUEUE_SIZE);

        p.flush();
        assert_eq!(port.pop_for_host(), None);
    }

    #[test]
    fn test_irq_flag_follows_command_byte() {
        let port = QueuedHostPort::new();
        let mut kbd = HostKeyboard::new(&port);
        kbd.handle(HostWrite::Command(0x60)).unwrap();
        kbd.handle(HostWrite::Data(0x01)).unwrap();
        assert!(port.irq_enabled());
        kbd.handle(HostWrite::Command(0x60)).unwrap();
        kbd.handle(HostWrite::Data(0x00)).unwrap();
        assert!(!port.irq_enabled());
    }

    #[test]
    fn test_keys_dropped_while_disabled() {
        let mut kbd = HostKeyboard::new(MockHostPort::new());
        assert_eq!(kbd.key_state_changed(1, 1, true), Ok(()));
        assert!(kbd.port.sent().is_empty());

        kbd.handle(HostWrite::Data(0xf4)).unwrap();
        assert_eq!(kbd.port.take_sent(), [0xfa]);
        kbd.key_state_changed(1, 1, true).unwrap();
        kbd.key_state_changed(1, 1, false).unwrap();
        // Translation is on after reset.
        assert_eq!(kbd.port.take_sent(), [0x01, 0x81]);

        assert_eq!(kbd.key_state_changed(0, 0, true), Err(EcError::Unimplemented));
        assert!(kbd.port.sent().is_empty());
    }

    #[test]
    fn test_full_host_queue_reports_busy_buffer() {
        let port = QueuedHostPort::new();
        let mut kbd = HostKeyboard::new(&port);
        kbd.handle(HostWrite::Data(0xf4)).unwrap();
        while port.pending() < HOST_QUEUE_SIZE {
            kbd.key_state_changed(4, 1, true).unwrap();
        }
        assert_eq!(kbd.key_state_changed(4, 1, true), Err(EcError::BufferFull));
        assert_eq!(kbd.handle(HostWrite::Data(0xee)), Err(EcError::BufferFull));
    }

    #[test]
    fn test_host_task_answers_queued_writes() {
        let input = HostInput::new();
        let port = QueuedHostPort::new();
        let keyboard = AsyncMutex::new(HostKeyboard::new(&port));

        let mut task = pin!(host_task(&input, &keyboard));
        assert!(poll_once(task.as_mut()).is_pending());

        assert!(input.receive(HostWrite::Data(0xf2)));
        assert!(input.receive(HostWrite::Command(0xaa)));
        assert!(poll_once(task.as_mut()).is_pending());

        let mut sent = std::vec::Vec::new();
        while let Some(b) = port.pop_for_host() {
            sent.push(b);
        }
        assert_eq!(sent, [0xfa, 0xab, 0x83, 0x55]);
    }

    std::thread_local! {
        static RECORDS: core::cell::Cell<usize> = const { core::cell::Cell::new(0) };
    }

    /// Counts records logged on the current test thread.
    struct CountingLogger;

    impl log::Log for CountingLogger {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, _: &log::Record) {
            RECORDS.with(|n| n.set(n.get() + 1));
        }

        fn flush(&self) {}
    }

    static COUNTING_LOGGER: CountingLogger = CountingLogger;

    fn records_logged() -> usize {
        // Only the first test to get here installs it.
        let _ = log::set_logger(&COUNTING_LOGGER);
        log::set_max_level(log::LevelFilter::Trace);
        RECORDS.with(|n| n.get())
    }

    #[test]
    fn test_input_queue_drops_when_full_without_logging() {
        let input = HostInput::new();
        for _ in 0..HOST_INPUT_QUEUE_SIZE {
            assert!(input.receive(HostWrite::Data(0xee)));
        }

        let before = records_logged();
        assert!(!input.receive(HostWrite::Data(0xee)));
        assert!(!input.receive(HostWrite::Command(0xaa)));
        assert_eq!(records_logged(), before);
        assert_eq!(input.dropped(), 2);
    }

    #[test]
    fn test_host_task_reports_overrun_and_keeps_going() {
        let input = HostInput::new();
        let port = QueuedHostPort::new();
        let keyboard = AsyncMutex::new(HostKeyboard::new(&port));
        for _ in 0..HOST_INPUT_QUEUE_SIZE {
            input.receive(HostWrite::Data(0xee));
        }
        assert!(!input.receive(HostWrite::Data(0xee)));

        let before = records_logged();
        let mut task = pin!(host_task(&input, &keyboard));
        assert!(poll_once(task.as_mut()).is_pending());
        assert!(records_logged() > before);

        // Every queued echo was answered.
        assert_eq!(port.pending(), 2 * HOST_INPUT_QUEUE_SIZE);
    }
}
