//! Host-side test doubles for the HAL traits.
//!
//! Everything here runs without hardware: unit tests and the integration
//! tests in `tests/` drive the core through these mocks.
//!
//! ```rust,ignore
//! use ember_kernel::testutil::{MockSerial, block_on};
//! ```

use crate::config::KB_COLS;
use alloc::{rc::Rc, string::String, vec::Vec};
use core::{
    cell::Cell,
    future::Future,
    pin::{pin, Pin},
    sync::atomic::{AtomicU64, Ordering},
    task::{Context, Poll},
};
use ember_hal::{ColumnDrive, Delay, Gpio, HostKeyboardPort, KeyboardMatrix, Serial, Timer};
use futures_util::task::noop_waker_ref;

/// Poll a future once with a waker that does nothing.
pub fn poll_once<F: Future + ?Sized>(fut: Pin<&mut F>) -> Poll<F::Output> {
    let mut cx = Context::from_waker(noop_waker_ref());
    fut.poll(&mut cx)
}

/// Drive a future to completion by polling it in a loop.
///
/// Panics if it is still pending after a generous number of polls, so a
/// test waiting on an event nobody signals fails instead of hanging.
pub fn block_on<F: Future>(fut: F) -> F::Output {
    let mut fut = pin!(fut);
    for _ in 0..100_000 {
        if let Poll::Ready(out) = poll_once(fut.as_mut()) {
            return out;
        }
    }
    panic!("future did not complete");
}

/// UART with a scripted receive FIFO and a recorded transmit side.
pub struct MockSerial {
    input: Vec<u8>,
    output: Vec<u8>,
    fifo_depth: usize,
    in_fifo: usize,
    tx_interrupt: bool,
}

impl MockSerial {
    /// Serial port with an unbounded transmit FIFO.
    pub fn new() -> Self {
        Self {
            input: Vec::new(),
            output: Vec::new(),
            fifo_depth: usize::MAX,
            in_fifo: 0,
            tx_interrupt: false,
        }
    }

    /// Bytes the "remote side" will send.
    pub fn queue_input(&mut self, bytes: &[u8]) {
        self.input.extend_from_slice(bytes);
    }

    /// Transmit FIFO depth; `tx_ready` goes false once this many bytes are
    /// written without a `flush`.
    pub fn set_fifo_depth(&mut self, depth: usize) {
        self.fifo_depth = depth;
    }

    /// Everything transmitted so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Transmitted bytes, clearing the record.
    pub fn take_output(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.output)
    }

    /// Transmitted bytes as text.
    pub fn take_output_string(&mut self) -> String {
        String::from_utf8_lossy(&self.take_output()).into_owned()
    }

    /// Last value passed to `set_tx_interrupt`.
    pub fn tx_interrupt_enabled(&self) -> bool {
        self.tx_interrupt
    }
}

impl Default for MockSerial {
    fn default() -> Self {
        Self::new()
    }
}

impl Serial for MockSerial {
    fn write_byte(&mut self, byte: u8) {
        assert!(self.tx_ready(), "write to full tx fifo");
        self.output.push(byte);
        self.in_fifo += 1;
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.input.is_empty() {
            None
        } else {
            Some(self.input.remove(0))
        }
    }

    fn tx_ready(&self) -> bool {
        self.in_fifo < self.fifo_depth
    }

    fn set_tx_interrupt(&mut self, enabled: bool) {
        self.tx_interrupt = enabled;
    }

    fn flush(&mut self) {
        self.in_fifo = 0;
    }
}

/// Which keys are held, shared between a test and the [`MockMatrix`] it
/// handed to a task.
#[derive(Clone, Default)]
pub struct MatrixKeys {
    pressed: Rc<Cell<[u8; KB_COLS]>>,
}

impl MatrixKeys {
    /// Hold the key at (`row`, `col`).
    pub fn press(&self, row: usize, col: usize) {
        let mut keys = self.pressed.get();
        keys[col] |= 1 << row;
        self.pressed.set(keys);
    }

    /// Let go of the key at (`row`, `col`).
    pub fn release(&self, row: usize, col: usize) {
        let mut keys = self.pressed.get();
        keys[col] &= !(1 << row);
        self.pressed.set(keys);
    }

    fn get(&self) -> [u8; KB_COLS] {
        self.pressed.get()
    }
}

/// Keyboard matrix answering row samples from a set of held keys.
pub struct MockMatrix {
    keys: MatrixKeys,
    drive: ColumnDrive,
    row_interrupt: bool,
    cleared: u32,
}

impl MockMatrix {
    /// Matrix with no keys held and columns tri-stated.
    pub fn new() -> Self {
        Self {
            keys: MatrixKeys::default(),
            drive: ColumnDrive::TriStateAll,
            row_interrupt: false,
            cleared: 0,
        }
    }

    /// A handle for pressing keys after the matrix has been moved.
    pub fn handle(&self) -> MatrixKeys {
        self.keys.clone()
    }

    /// Hold the key at (`row`, `col`).
    pub fn press(&self, row: usize, col: usize) {
        self.keys.press(row, col);
    }

    /// Let go of the key at (`row`, `col`).
    pub fn release(&self, row: usize, col: usize) {
        self.keys.release(row, col);
    }

    /// Current column drive.
    pub fn drive(&self) -> ColumnDrive {
        self.drive
    }

    /// Whether the row interrupt is enabled.
    pub fn row_interrupt_enabled(&self) -> bool {
        self.row_interrupt
    }

    /// How many times the interrupt status was cleared.
    pub fn interrupts_cleared(&self) -> u32 {
        self.cleared
    }
}

impl Default for MockMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardMatrix for MockMatrix {
    fn drive_column(&mut self, drive: ColumnDrive) {
        self.drive = drive;
    }

    fn sample_rows(&mut self) -> u8 {
        let keys = self.keys.get();
        let active = match self.drive {
            ColumnDrive::AssertAll => keys.iter().fold(0, |acc, &rows| acc | rows),
            ColumnDrive::TriStateAll => 0,
            ColumnDrive::Column(col) => keys.get(col).copied().unwrap_or(0),
        };
        // Active-low.
        !active
    }

    fn enable_row_interrupt(&mut self) {
        self.row_interrupt = true;
    }

    fn disable_row_interrupt(&mut self) {
        self.row_interrupt = false;
    }

    fn clear_row_interrupt(&mut self) -> u32 {
        self.cleared += 1;
        0
    }
}

/// Host keyboard port that records what the host would receive.
pub struct MockHostPort {
    sent: Vec<u8>,
    irq_enabled: bool,
    irq_toggles: u32,
    flushes: u32,
}

impl MockHostPort {
    /// Port with nothing sent and the IRQ off.
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            irq_enabled: false,
            irq_toggles: 0,
            flushes: 0,
        }
    }

    /// Bytes queued for the host since the last flush.
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// Queued bytes, clearing the record.
    pub fn take_sent(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.sent)
    }

    /// Whether the keyboard IRQ is enabled.
    pub fn irq_enabled(&self) -> bool {
        self.irq_enabled
    }

    /// Number of enable/disable calls.
    pub fn irq_toggles(&self) -> u32 {
        self.irq_toggles
    }

    /// Number of flushes.
    pub fn flushes(&self) -> u32 {
        self.flushes
    }
}

impl Default for MockHostPort {
    fn default() -> Self {
        Self::new()
    }
}

impl HostKeyboardPort for MockHostPort {
    fn send_to_host(&mut self, bytes: &[u8]) -> bool {
        self.sent.extend_from_slice(bytes);
        true
    }

    fn enable_keyboard_irq(&mut self) {
        self.irq_enabled = true;
        self.irq_toggles += 1;
    }

    fn disable_keyboard_irq(&mut self) {
        self.irq_enabled = false;
        self.irq_toggles += 1;
    }

    fn flush(&mut self) {
        self.sent.clear();
        self.flushes += 1;
    }
}

/// Timer that only moves when told to.
pub struct MockTimer {
    now: AtomicU64,
}

impl MockTimer {
    /// Timer at zero.
    pub const fn new() -> Self {
        Self {
            now: AtomicU64::new(0),
        }
    }

    /// Move time forward by `us` microseconds.
    pub fn advance(&self, us: u64) {
        self.now.fetch_add(us, Ordering::Relaxed);
    }
}

impl Default for MockTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for MockTimer {
    fn current_ticks(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

/// Busy-wait that returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Delay for NoDelay {
    fn delay_us(&mut self, _us: u32) {}
}

/// GPIO bank that remembers driven levels.
pub struct MockGpio {
    levels: [bool; 32],
}

impl MockGpio {
    /// All lines low.
    pub fn new() -> Self {
        Self { levels: [false; 32] }
    }
}

impl Default for MockGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl Gpio for MockGpio {
    fn get_level(&self, index: usize) -> bool {
        self.levels[index]
    }

    fn set_level(&mut self, index: usize, high: bool) {
        self.levels[index] = high;
    }
}

/// A single-line terminal model, for checking that echoed output leaves
/// the display where the editor thinks it is.
///
/// Understands printable overwrite, `\b`, `\r`, form feed (clears) and
/// `ESC [ n C` / `ESC [ n D`.
pub struct TerminalModel {
    cells: Vec<u8>,
    cursor: usize,
    esc: Option<Vec<u8>>,
}

impl TerminalModel {
    /// Blank terminal, cursor in column 0.
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            cursor: 0,
            esc: None,
        }
    }

    /// Interpret output bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &c in bytes {
            self.feed_byte(c);
        }
    }

    fn feed_byte(&mut self, c: u8) {
        if let Some(seq) = self.esc.as_mut() {
            seq.push(c);
            if c.is_ascii_alphabetic() {
                let seq = self.esc.take().unwrap_or_default();
                self.apply_escape(&seq);
            }
            return;
        }

        match c {
            0x1b => self.esc = Some(Vec::new()),
            0x08 => self.cursor = self.cursor.saturating_sub(1),
            b'\r' => self.cursor = 0,
            0x0c => {
                self.cells.clear();
                self.cursor = 0;
            }
            0x20..=0x7e => {
                if self.cursor >= self.cells.len() {
                    self.cells.resize(self.cursor + 1, b' ');
                }
                self.cells[self.cursor] = c;
                self.cursor += 1;
            }
            _ => {}
        }
    }

    fn apply_escape(&mut self, seq: &[u8]) {
        // seq is "[<n><dir>"
        let Some((&dir, body)) = seq.split_last() else {
            return;
        };
        let digits = body.strip_prefix(b"[").unwrap_or(body);
        let n = core::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(1);
        match dir {
            b'C' => self.cursor += n,
            b'D' => self.cursor = self.cursor.saturating_sub(n),
            _ => {}
        }
    }

    /// Cursor column.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Displayed text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.cells).into_owned()
    }
}

impl Default for TerminalModel {
    fn default() -> Self {
        Self::new()
    }
}
