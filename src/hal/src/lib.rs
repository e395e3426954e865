//! Ember EC Hardware Abstraction Layer (HAL) traits.
//!
//! This crate defines the traits the EC core consumes from board and chip
//! support code. Nothing here touches registers; boards implement these.

#![no_std]

/// Trait for a serial port or similar character-based communication channel.
///
/// Implementations are driven from the UART interrupt handler.
pub trait Serial {
    /// Writes a single byte to the transmit FIFO.
    fn write_byte(&mut self, byte: u8);
    /// Reads a single byte from the receive FIFO, if available.
    fn read_byte(&mut self) -> Option<u8>;
    /// Returns true if the transmit FIFO can take another byte.
    fn tx_ready(&self) -> bool;
    /// Enables or disables the transmit-ready interrupt.
    fn set_tx_interrupt(&mut self, enabled: bool);
    /// Blocks until the transmit FIFO has drained to the wire.
    fn flush(&mut self) {}
}

/// Column drive selection for the keyboard matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDrive {
    /// Drive every column active (used while waiting for a row interrupt).
    AssertAll,
    /// Tri-state every column.
    TriStateAll,
    /// Drive only the given column active; others are tri-stated.
    Column(usize),
}

/// Trait for the keyboard matrix pins.
pub trait KeyboardMatrix {
    /// Drives the columns as selected.
    fn drive_column(&mut self, drive: ColumnDrive);
    /// Samples the row inputs. Rows are active-low: a pressed key reads 0.
    fn sample_rows(&mut self) -> u8;
    /// Enables the row-change interrupt on both edges.
    fn enable_row_interrupt(&mut self);
    /// Disables the row-change interrupt.
    fn disable_row_interrupt(&mut self);
    /// Clears pending row-change interrupt status, returning the old status.
    fn clear_row_interrupt(&mut self) -> u32;
}

/// Trait for the host-facing legacy keyboard port (0x60/0x64 equivalent).
pub trait HostKeyboardPort {
    /// Queues bytes for the host to read. Returns false if they did not fit.
    fn send_to_host(&mut self, bytes: &[u8]) -> bool;
    /// Enables the keyboard IRQ towards the host.
    fn enable_keyboard_irq(&mut self);
    /// Disables the keyboard IRQ towards the host.
    fn disable_keyboard_irq(&mut self);
    /// Discards any bytes still queued for the host.
    fn flush(&mut self);
}

/// Trait for reading and driving GPIO levels by signal index.
pub trait Gpio {
    /// Returns the current level of the signal.
    fn get_level(&self, index: usize) -> bool;
    /// Drives the signal to the given level.
    fn set_level(&mut self, index: usize, high: bool);
}

/// Trait for controlling interrupts.
pub trait InterruptController {
    /// Globally enables interrupts.
    fn enable(&mut self);
    /// Globally disables interrupts.
    fn disable(&mut self);
    /// Enables interrupts and halts until the next one arrives.
    fn enable_and_wait(&mut self);
}

/// Trait for a system timer.
pub trait Timer {
    /// Returns the number of microseconds since the system started.
    fn current_ticks(&self) -> u64;
}

/// Trait for short busy-wait delays.
pub trait Delay {
    /// Spins for at least `us` microseconds.
    fn delay_us(&mut self, us: u32);
}
