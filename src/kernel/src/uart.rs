//! Buffered console UART.
//!
//! The UART interrupt handler calls [`ConsoleUart::service`], which moves
//! received bytes into the receive ring and feeds the transmit FIFO from the
//! transmit ring. Task code only touches the rings. Each ring has exactly
//! one producer and one consumer:
//!
//! | ring | producer            | consumer            |
//! |------|---------------------|---------------------|
//! | rx   | `service` (ISR)     | console task        |
//! | tx   | task-side writers   | `service` (ISR)     |

use crate::{
    config::{UART_RX_BUF_SIZE, UART_TX_BUF_SIZE},
    sync::{Event, RingBuffer},
};
use conquer_once::spin::OnceCell;
use core::{
    fmt,
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
};
use ember_common::{EcError, EcResult};
use ember_hal::Serial;

/// Console UART state shared between the UART ISR and tasks.
pub struct ConsoleUart {
    tx: RingBuffer<UART_TX_BUF_SIZE>,
    rx: RingBuffer<UART_RX_BUF_SIZE>,
    console_mode: AtomicBool,
    input: Event,
    rx_dropped: AtomicU32,
    tx_kick: spin::Once<fn()>,
}

impl ConsoleUart {
    /// Create an idle UART in console mode.
    pub const fn new() -> Self {
        Self {
            tx: RingBuffer::new(),
            rx: RingBuffer::new(),
            console_mode: AtomicBool::new(true),
            input: Event::new(),
            rx_dropped: AtomicU32::new(0),
            tx_kick: spin::Once::new(),
        }
    }

    /// Register the board hook that re-enables the transmit interrupt.
    /// Only the first registration takes effect.
    pub fn set_tx_kick(&self, kick: fn()) {
        self.tx_kick.call_once(|| kick);
    }

    /// Interrupt-side service routine.
    pub fn service<S: Serial + ?Sized>(&self, serial: &mut S) {
        let mut received = false;
        while let Some(byte) = serial.read_byte() {
            if !self.rx.push(byte) {
                self.rx_dropped.fetch_add(1, Ordering::Relaxed);
            }
            received = true;
        }
        if received {
            self.input.signal();
        }

        self.drain_tx(serial);
        serial.set_tx_interrupt(!self.tx.is_empty());
    }

    fn drain_tx<S: Serial + ?Sized>(&self, serial: &mut S) {
        while serial.tx_ready() {
            match self.tx.pop() {
                Some(byte) => serial.write_byte(byte),
                None => break,
            }
        }
    }

    /// Busy-drain the transmit ring to the wire regardless of interrupt
    /// state. For panic and crash paths only: it consumes the tx ring, so
    /// the ISR must not be running concurrently.
    pub fn emergency_flush<S: Serial + ?Sized>(&self, serial: &mut S) {
        loop {
            self.drain_tx(serial);
            serial.flush();
            if self.tx.is_empty() {
                break;
            }
        }
    }

    /// Ask the board to restart transmission.
    pub fn kick_tx(&self) {
        if let Some(kick) = self.tx_kick.get() {
            kick();
        }
    }

    /// Queue one byte with no newline translation.
    pub fn write_raw(&self, byte: u8) -> bool {
        self.tx.push(byte)
    }

    /// Queue one byte, translating LF to CRLF in console mode. A CRLF pair is
    /// queued whole or not at all.
    pub fn write_byte(&self, byte: u8) -> bool {
        if byte == b'\n' && self.is_console_mode() {
            if self.tx.space_available() < 2 {
                return false;
            }
            self.tx.push(b'\r');
        }
        self.tx.push(byte)
    }

    /// Queue a string. Stops at the first byte that does not fit.
    pub fn puts(&self, s: &str) -> EcResult<()> {
        let complete = s.bytes().all(|b| self.write_byte(b));
        self.kick_tx();
        if complete {
            Ok(())
        } else {
            Err(EcError::Overflow)
        }
    }

    /// A formatting writer over the transmit ring.
    pub fn writer(&self) -> UartWriter<'_> {
        UartWriter { uart: self }
    }

    /// Take one received byte. Used by the console task and by raw-mode
    /// consumers.
    pub fn read_byte(&self) -> Option<u8> {
        self.rx.pop()
    }

    /// Discard all pending received bytes.
    pub fn flush_input(&self) {
        self.rx.clear();
        self.input.take();
    }

    /// Switch between console mode (line editing, CRLF output) and raw mode.
    pub fn set_console_mode(&self, enable: bool) {
        self.console_mode.store(enable, Ordering::Relaxed);
        // Raw consumers read straight from the rx ring; make sure they notice
        // anything already queued.
        if !enable && !self.rx.is_empty() {
            self.input.signal();
        }
    }

    /// Whether console mode is active.
    pub fn is_console_mode(&self) -> bool {
        self.console_mode.load(Ordering::Relaxed)
    }

    /// Signalled by the ISR whenever bytes arrive.
    pub fn input_event(&self) -> &Event {
        &self.input
    }

    /// Bytes lost because the receive ring was full.
    pub fn dropped_rx(&self) -> u32 {
        self.rx_dropped.load(Ordering::Relaxed)
    }

    /// Bytes queued for transmission.
    pub fn tx_pending(&self) -> usize {
        self.tx.len()
    }
}

impl Default for ConsoleUart {
    fn default() -> Self {
        Self::new()
    }
}

/// `fmt::Write` adapter over [`ConsoleUart`].
pub struct UartWriter<'a> {
    uart: &'a ConsoleUart,
}

impl UartWriter<'_> {
    /// The underlying UART.
    pub fn uart(&self) -> &ConsoleUart {
        self.uart
    }
}

impl fmt::Write for UartWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.uart.puts(s).map_err(|_| fmt::Error)
    }
}

static CONSOLE: OnceCell<&'static ConsoleUart> = OnceCell::uninit();

/// Make `uart` the target of [`ec_print!`](crate::ec_print) and the logger.
pub fn register_console(uart: &'static ConsoleUart) -> EcResult<()> {
    CONSOLE
        .try_init_once(|| uart)
        .map_err(|_| EcError::AlreadyInitialized)
}

/// The registered console, if any.
pub fn console() -> Option<&'static ConsoleUart> {
    CONSOLE.get().copied()
}

/// Prints to the console UART without a newline.
#[macro_export]
macro_rules! ec_print {
    ($($arg:tt)*) => {
        $crate::uart::_print(format_args!($($arg)*))
    };
}

/// Prints to the console UART with a newline.
#[macro_export]
macro_rules! ec_println {
    () => ($crate::ec_print!("\n"));
    ($($arg:tt)*) => ($crate::ec_print!("{}\n", format_args!($($arg)*)))
}

/// Internal print function used by macros.
#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use core::fmt::Write;

    if let Some(uart) = console() {
        // Output that does not fit is dropped.
        let _ = uart.writer().write_fmt(args);
    }
}
