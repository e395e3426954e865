//! Ember EC core
//!
//! Board-independent embedded controller firmware: a serial console with
//! line editing and command history, and a keyboard matrix scanner feeding
//! an emulated i8042 keyboard controller.
//!
//! # Architecture
//!
//! - `sync`: SPSC byte rings, ISR-to-task events, an async mutex
//! - `task`: cooperative priority executor and timer sleeps
//! - `uart`: the buffered console UART and print macros
//! - `console`: line editor, history, command dispatch and the console task
//! - `keyboard`: matrix scanner, scan code tables, i8042 emulation
//! - `gpio`: validated board signal table
//! - `logger`: `log` backend writing to the console
//!
//! Hardware is reached only through the traits in `ember_hal`.
//!
//! # Safety
//!
//! The only `unsafe` code is in the lock-free ring and the async mutex.
//! Each block documents the invariant it relies on.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod config;
pub mod console;
pub mod gpio;
pub mod keyboard;
pub mod logger;
pub mod sync;
pub mod task;
pub mod testutil;
pub mod uart;

pub use ember_common::{EcError, EcResult};

use uart::ConsoleUart;

/// Bring up the console and logging.
///
/// Called once from board init, before any task runs. Fails with
/// `AlreadyInitialized` on a second call.
pub fn init(uart: &'static ConsoleUart, log: &config::LogConfig) -> EcResult<()> {
    uart::register_console(uart)?;
    logger::init(log)
}
