//! The console task.

use super::{
    command::{CommandTable, Shell},
    editor::LineEditor,
    line::Line,
};
use crate::{
    config::PROMPT,
    keyboard::{
        host::{HostKeyboard, QueuedHostPort},
        scan::MatrixSnapshot,
    },
    sync::AsyncMutex,
    uart::ConsoleUart,
};
use ember_hal::HostKeyboardPort;
use log::{debug, warn};

/// Printed once when the console starts.
pub const BANNER: &str = "Console is enabled; type HELP for help.\n";

/// Console state: the line editor plus what commands may reach.
pub struct Console<'a, P = &'static QueuedHostPort> {
    uart: &'a ConsoleUart,
    commands: &'a CommandTable,
    editor: LineEditor,
    keyboard: Option<&'a AsyncMutex<HostKeyboard<P>>>,
    matrix: Option<&'a MatrixSnapshot>,
    dropped_rx: u32,
}

impl<'a> Console<'a> {
    /// A console on `uart` running `commands`.
    pub fn new(uart: &'a ConsoleUart, commands: &'a CommandTable) -> Self {
        Self {
            uart,
            commands,
            editor: LineEditor::new(),
            keyboard: None,
            matrix: None,
            dropped_rx: 0,
        }
    }
}

impl<'a, P: HostKeyboardPort> Console<'a, P> {
    /// Give keyboard commands access to the emulated controller.
    pub fn with_keyboard<Q>(self, keyboard: &'a AsyncMutex<HostKeyboard<Q>>) -> Console<'a, Q> {
        Console {
            uart: self.uart,
            commands: self.commands,
            editor: self.editor,
            keyboard: Some(keyboard),
            matrix: self.matrix,
            dropped_rx: self.dropped_rx,
        }
    }

    /// Give `kbstate` the scanner's published state.
    pub fn with_matrix(mut self, matrix: &'a MatrixSnapshot) -> Self {
        self.matrix = Some(matrix);
        self
    }

    /// The line editor.
    pub fn editor(&self) -> &LineEditor {
        &self.editor
    }

    /// Consume every received byte, running each completed line.
    ///
    /// Does nothing in raw mode: the rx ring belongs to the raw consumer.
    pub async fn process(&mut self) {
        while self.uart.is_console_mode() {
            let Some(c) = self.uart.read_byte() else {
                break;
            };
            if let Some(line) = self.editor.feed(c, &mut self.uart.writer()) {
                self.execute(&line).await;
                // Output that does not fit is dropped.
                let _ = self.uart.puts(PROMPT);
            }
        }
        self.uart.kick_tx();

        let dropped = self.uart.dropped_rx();
        if dropped != self.dropped_rx {
            warn!("console input overrun, {} bytes lost", dropped - self.dropped_rx);
            self.dropped_rx = dropped;
        }
    }

    async fn execute(&mut self, line: &Line) {
        let mut out = self.uart.writer();
        let matrix = self.matrix.map(MatrixSnapshot::load);
        let mut keyboard = match self.keyboard {
            Some(kb) => Some(kb.lock().await),
            None => None,
        };

        let mut shell = Shell::new(&mut out, self.commands).with_history(self.editor.history());
        if let Some(matrix) = matrix {
            shell = shell.with_matrix(matrix);
        }
        if let Some(kb) = keyboard.as_mut() {
            shell = shell.with_keyboard(kb.access());
        }
        if let Err(e) = shell.execute(line.as_str()) {
            debug!("command failed: {}", e);
        }
    }

    /// Print the banner and prompt, then serve input forever.
    pub async fn run(mut self) {
        let _ = self.uart.puts(BANNER);
        let _ = self.uart.puts(PROMPT);
        loop {
            self.process().await;
            self.uart.input_event().wait().await;
        }
    }
}

/// The console task.
pub async fn console_task<P: HostKeyboardPort>(console: Console<'_, P>) {
    console.run().await
}
