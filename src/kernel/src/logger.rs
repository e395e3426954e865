//! `log` backend writing to the console UART.
//!
//! Records go into the console transmit ring, so logging is for task context
//! only. Interrupt handlers must not log: they would become a second producer
//! on the transmit ring.

use crate::{config::LogConfig, uart};
use conquer_once::spin::OnceCell;
use core::fmt::{self, Write};
use ember_common::{EcError, EcResult};
use log::{LevelFilter, Log, Metadata, Record};

struct ConsoleLogger {
    level: LevelFilter,
}

static LOGGER: OnceCell<ConsoleLogger> = OnceCell::uninit();

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(console) = uart::console() {
            // Records that do not fit in the ring are truncated.
            let _ = write_record(&mut console.writer(), record);
        }
    }

    fn flush(&self) {
        if let Some(console) = uart::console() {
            console.kick_tx();
        }
    }
}

fn write_record(out: &mut impl Write, record: &Record) -> fmt::Result {
    writeln!(out, "[{} {}] {}", record.level(), record.target(), record.args())
}

/// Install the console logger. Fails if a logger is already installed.
pub fn init(config: &LogConfig) -> EcResult<()> {
    LOGGER
        .try_init_once(|| ConsoleLogger {
            level: config.level,
        })
        .map_err(|_| EcError::AlreadyInitialized)?;
    let logger = LOGGER.get().ok_or(EcError::Unknown)?;

    log::set_logger(logger).map_err(|_| EcError::AlreadyInitialized)?;
    log::set_max_level(config.level);
    log::info!("logger up at {}", config.level);
    Ok(())
}
