//! Build-time sizes and runtime tunables.

use log::LevelFilter;

/// Transmit ring size. Must be a power of two.
pub const UART_TX_BUF_SIZE: usize = 512;

/// Receive ring size. Must be a power of two.
pub const UART_RX_BUF_SIZE: usize = 128;

/// Number of command history slots. Must be a power of two.
pub const HISTORY_SIZE: usize = 8;

/// Bytes of command history storage. Must be a power of two and larger than
/// [`RX_LINE_SIZE`] so pasted scripts can be recalled.
pub const HISTORY_BUF_SIZE: usize = 128;

/// The size limit of a single command line.
pub const RX_LINE_SIZE: usize = 80;

/// Words past this limit make the dispatcher report an overflow.
pub const MAX_ARGS_PER_COMMAND: usize = 10;

/// Console prompt.
pub const PROMPT: &str = "> ";

/// Keyboard matrix rows.
pub const KB_ROWS: usize = 8;

/// Keyboard matrix columns.
pub const KB_COLS: usize = 13;

/// Bytes the host-bound keyboard queue can hold.
pub const HOST_QUEUE_SIZE: usize = 32;

/// Host port writes buffered between the bus interrupt and the i8042 task.
pub const HOST_INPUT_QUEUE_SIZE: usize = 16;

/// Keyboard scanner timing and key layout.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Delay between polls while keys are active.
    pub scan_interval_us: u64,
    /// Idle time with no key held before re-arming the row interrupt.
    pub polling_timeout_us: u64,
    /// Settle time after driving a column, before sampling rows.
    pub settle_us: u32,
    /// Per-column mask with 1 bits only for keys that actually exist.
    pub key_mask: [u8; KB_COLS],
}

impl ScanConfig {
    /// Number of consecutive empty polls that ends polling mode.
    pub fn idle_polls(&self) -> u32 {
        let polls = self.polling_timeout_us / self.scan_interval_us.max(1);
        polls.clamp(1, u32::MAX as u64) as u32
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_interval_us: 10_000,
            polling_timeout_us: 1_000_000,
            settle_us: 20,
            key_mask: [0xff; KB_COLS],
        }
    }
}

/// Logger configuration.
#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    /// Records above this level are discarded.
    pub level: LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
        }
    }
}
