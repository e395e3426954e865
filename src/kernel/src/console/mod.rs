//! Serial console: line editing, history and command dispatch.
//!
//! Bytes arrive through [`ConsoleUart`](crate::uart::ConsoleUart). The
//! [`Console`] task feeds them to the [`LineEditor`], which echoes and edits
//! the current line and records completed lines in [`History`]. Completed
//! lines go to a [`Shell`], which looks the command up in a
//! [`CommandTable`] and runs its handler.

mod command;
mod commands;
mod editor;
mod escape;
mod history;
mod line;
mod task;

pub use command::{
    parse_int, parse_u8_arg, split_words, CommandHandler, CommandTable, ConsoleCommand,
    KeyboardAccess, Shell,
};
pub use commands::{command_help, command_history, command_kbstate, DEFAULT_COMMANDS};
pub use editor::{Echo, LineEditor};
pub use escape::{EscAction, EscState};
pub use history::History;
pub use line::{Line, LineBuffer};
pub use task::{console_task, Console, BANNER};
