//! Keyboard matrix scanning.
//!
//! While no key is held the scanner drives every column and sleeps on the
//! row-change interrupt. A row change switches it to polling: one column at
//! a time, every `scan_interval_us`, until `polling_timeout_us` passes with
//! nothing held.

use super::{host::HostKeyboard, KeyEvent};
use crate::{
    config::{ScanConfig, KB_COLS, KB_ROWS},
    sync::{AsyncMutex, Event},
    task::sleep_us,
};
use core::sync::atomic::{AtomicU8, Ordering};
use ember_common::EcError;
use ember_hal::{ColumnDrive, Delay, HostKeyboardPort, KeyboardMatrix, Timer};
use log::{debug, warn};

/// What the scanner is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// All columns driven, row interrupt armed.
    WaitingForInterrupt,
    /// Row interrupt off, columns scanned one by one.
    Polling,
}

/// Debounced matrix state and the polling state machine.
pub struct MatrixScanner {
    raw_state: [u8; KB_COLS],
    config: ScanConfig,
    mode: ScanMode,
    idle_polls: u32,
}

impl MatrixScanner {
    /// Scanner with nothing pressed.
    pub fn new(config: ScanConfig) -> Self {
        Self {
            raw_state: [0; KB_COLS],
            config,
            mode: ScanMode::WaitingForInterrupt,
            idle_polls: 0,
        }
    }

    /// Current mode.
    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// Pressed rows per column, as of the last scan.
    pub fn raw_state(&self) -> &[u8; KB_COLS] {
        &self.raw_state
    }

    /// Timing and key mask in use.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Returns true if any key was held at the last scan.
    pub fn any_pressed(&self) -> bool {
        self.raw_state.iter().any(|&rows| rows != 0)
    }

    /// Arm the row interrupt with every column driven.
    ///
    /// Returns true if a row is already active. A key that went down after
    /// the last poll but before the interrupt was armed raised no interrupt,
    /// so the caller must go straight back to polling in that case.
    pub fn wait_for_interrupt(&mut self, matrix: &mut impl KeyboardMatrix) -> bool {
        matrix.drive_column(ColumnDrive::AssertAll);
        matrix.clear_row_interrupt();
        matrix.enable_row_interrupt();
        if self.mode != ScanMode::WaitingForInterrupt {
            debug!("keyboard scan: waiting for interrupt");
        }
        self.mode = ScanMode::WaitingForInterrupt;

        !matrix.sample_rows() != 0
    }

    /// Leave interrupt mode and start polling.
    pub fn enter_polling(&mut self, matrix: &mut impl KeyboardMatrix) {
        matrix.disable_row_interrupt();
        self.mode = ScanMode::Polling;
        self.idle_polls = 0;
        debug!("keyboard scan: polling");
    }

    /// Scan every column once, reporting each changed key to `on_edge`.
    ///
    /// Returns true if any key is held.
    pub fn scan(
        &mut self,
        matrix: &mut impl KeyboardMatrix,
        delay: &mut impl Delay,
        mut on_edge: impl FnMut(KeyEvent),
    ) -> bool {
        for col in 0..KB_COLS {
            matrix.drive_column(ColumnDrive::Column(col));
            delay.delay_us(self.config.settle_us);

            // Rows are active-low.
            let state = !matrix.sample_rows() & self.config.key_mask[col];
            let changed = state ^ self.raw_state[col];
            for row in (0..KB_ROWS).filter(|&row| changed & (1 << row) != 0) {
                on_edge(KeyEvent {
                    row,
                    col,
                    pressed: state & (1 << row) != 0,
                });
            }
            self.raw_state[col] = state;
        }
        matrix.drive_column(ColumnDrive::TriStateAll);

        self.any_pressed()
    }

    /// One polling step. Returns false once the idle timeout has passed
    /// and the scanner should go back to waiting for an interrupt.
    pub fn poll(
        &mut self,
        matrix: &mut impl KeyboardMatrix,
        delay: &mut impl Delay,
        on_edge: impl FnMut(KeyEvent),
    ) -> bool {
        if self.scan(matrix, delay, on_edge) {
            self.idle_polls = 0;
        } else {
            self.idle_polls += 1;
        }
        self.idle_polls < self.config.idle_polls()
    }
}

/// Row-change interrupt handler body: clear the status and wake the scan
/// task.
pub fn matrix_interrupt(matrix: &mut impl KeyboardMatrix, wake: &Event) {
    matrix.clear_row_interrupt();
    wake.signal();
}

/// Copy of the scanner state readable from other tasks.
pub struct MatrixSnapshot {
    cols: [AtomicU8; KB_COLS],
}

impl MatrixSnapshot {
    /// All keys up.
    pub const fn new() -> Self {
        const UP: AtomicU8 = AtomicU8::new(0);
        Self {
            cols: [UP; KB_COLS],
        }
    }

    /// Publish a new state.
    pub fn store(&self, state: &[u8; KB_COLS]) {
        for (col, &rows) in self.cols.iter().zip(state) {
            col.store(rows, Ordering::Relaxed);
        }
    }

    /// Latest published state.
    pub fn load(&self) -> [u8; KB_COLS] {
        core::array::from_fn(|i| self.cols[i].load(Ordering::Relaxed))
    }
}

impl Default for MatrixSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

fn forward<P: HostKeyboardPort>(keyboard: &mut HostKeyboard<P>, event: KeyEvent) {
    match keyboard.key_state_changed(event.row, event.col, event.pressed) {
        Ok(()) => {}
        Err(EcError::Unimplemented) => {
            warn!("no key at ({}, {})", event.row, event.col);
        }
        Err(e) => {
            warn!("key ({}, {}) dropped: {}", event.row, event.col, e);
        }
    }
}

/// The keyboard scan task.
pub async fn scan_task<M, D, T, P>(
    mut scanner: MatrixScanner,
    mut matrix: M,
    mut delay: D,
    timer: &T,
    wake: &Event,
    keyboard: &AsyncMutex<HostKeyboard<P>>,
    snapshot: &MatrixSnapshot,
) where
    M: KeyboardMatrix,
    D: Delay,
    T: Timer + ?Sized,
    P: HostKeyboardPort,
{
    loop {
        if scanner.wait_for_interrupt(&mut matrix) {
            wake.take();
        } else {
            wake.wait().await;
        }
        scanner.enter_polling(&mut matrix);

        loop {
            let polling = {
                let mut kb = keyboard.lock().await;
                scanner.poll(&mut matrix, &mut delay, |event| forward(&mut kb, event))
            };
            snapshot.store(scanner.raw_state());
            if !polling {
                break;
            }
            sleep_us(timer, scanner.config().scan_interval_us).await;
        }
    }
}
