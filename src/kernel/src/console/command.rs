//! Console command table and dispatcher.

use super::history::History;
use crate::{
    config::{KB_COLS, MAX_ARGS_PER_COMMAND},
    keyboard::i8042::I8042,
};
use core::fmt::{self, Write};
use ember_common::{EcError, EcResult};
use ember_hal::HostKeyboardPort;
use log::{debug, warn};

/// Handler signature: the shell context and the words of the line, the
/// command name first.
pub type CommandHandler = fn(&mut Shell<'_>, &[&str]) -> EcResult<()>;

/// A statically registered console command.
pub struct ConsoleCommand {
    /// Name matched case-insensitively by unique prefix.
    pub name: &'static str,
    /// Handler.
    pub handler: CommandHandler,
    /// Argument synopsis printed in usage hints.
    pub argdesc: Option<&'static str>,
    /// One-line description for `help list`.
    pub shorthelp: &'static str,
}

/// The set of commands the console knows.
pub struct CommandTable {
    commands: &'static [ConsoleCommand],
}

impl CommandTable {
    /// Wrap a static command list.
    pub const fn new(commands: &'static [ConsoleCommand]) -> Self {
        Self { commands }
    }

    /// All commands, in registration order.
    pub fn commands(&self) -> &'static [ConsoleCommand] {
        self.commands
    }

    /// Look up a command by case-insensitive prefix. An exact name match
    /// wins over longer names sharing the prefix; otherwise the prefix must
    /// be unique.
    pub fn find(&self, name: &str) -> EcResult<&'static ConsoleCommand> {
        if let Some(exact) = self
            .commands
            .iter()
            .find(|cmd| cmd.name.eq_ignore_ascii_case(name))
        {
            return Ok(exact);
        }

        let mut matches = self.commands.iter().filter(|cmd| {
            cmd.name.len() > name.len()
                && cmd.name.as_bytes()[..name.len()].eq_ignore_ascii_case(name.as_bytes())
        });
        match (matches.next(), matches.next()) {
            (Some(cmd), None) => Ok(cmd),
            (Some(_), Some(_)) => Err(EcError::Ambiguous),
            (None, _) => Err(EcError::NotFound),
        }
    }
}

/// Split a line into whitespace-separated words. `#` starts a comment.
///
/// Returns the word count. Past `argv.len()` words the result is
/// `Err(Overflow)`, with the words that fit left in `argv`.
pub fn split_words<'l>(line: &'l str, argv: &mut [&'l str]) -> EcResult<usize> {
    let content = match line.find('#') {
        Some(comment) => &line[..comment],
        None => line,
    };

    let mut argc = 0;
    for word in content.split_ascii_whitespace() {
        if argc >= argv.len() {
            return Err(EcError::Overflow);
        }
        argv[argc] = word;
        argc += 1;
    }
    Ok(argc)
}

/// Parse a console integer: `0x` hex, or decimal with an optional sign.
pub fn parse_int(s: &str) -> Option<i32> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok().map(|v| v as i32);
    }
    s.parse().ok()
}

/// Parse argument `n` (1-based) as a byte, reporting `Param(n)` if invalid.
pub fn parse_u8_arg(argv: &[&str], n: usize) -> EcResult<u8> {
    argv.get(n)
        .and_then(|s| parse_int(s))
        .and_then(|v| u8::try_from(v).ok())
        .ok_or(EcError::param(n))
}

/// The keyboard controller and its host port, borrowed for one command.
pub struct KeyboardAccess<'a> {
    /// Controller state.
    pub i8042: &'a mut I8042,
    /// Port the controller talks to.
    pub port: &'a mut dyn HostKeyboardPort,
}

/// Context handed to command handlers.
pub struct Shell<'a> {
    /// Console output.
    pub out: &'a mut dyn Write,
    /// Registered commands, for `help`.
    pub commands: &'a CommandTable,
    /// Keyboard controller, when available.
    pub keyboard: Option<KeyboardAccess<'a>>,
    /// Saved command lines.
    pub history: Option<&'a History>,
    /// Latest keyboard matrix state, one byte per column.
    pub matrix: Option<[u8; KB_COLS]>,
}

impl<'a> Shell<'a> {
    /// A shell with only output and commands.
    pub fn new(out: &'a mut dyn Write, commands: &'a CommandTable) -> Self {
        Self {
            out,
            commands,
            keyboard: None,
            history: None,
            matrix: None,
        }
    }

    /// Attach the keyboard controller.
    pub fn with_keyboard(mut self, keyboard: KeyboardAccess<'a>) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Attach the command history.
    pub fn with_history(mut self, history: &'a History) -> Self {
        self.history = Some(history);
        self
    }

    /// Attach a matrix snapshot.
    pub fn with_matrix(mut self, matrix: [u8; KB_COLS]) -> Self {
        self.matrix = Some(matrix);
        self
    }

    /// Keyboard access, or `Unimplemented` when none is attached.
    pub fn keyboard(&mut self) -> EcResult<&mut KeyboardAccess<'a>> {
        self.keyboard.as_mut().ok_or(EcError::Unimplemented)
    }

    /// Run one input line. Errors are reported on the console and also
    /// returned; they never touch history or keyboard state.
    pub fn execute(&mut self, line: &str) -> EcResult<()> {
        let mut argv = [""; MAX_ARGS_PER_COMMAND];
        let argc = match split_words(line, &mut argv) {
            Ok(argc) => argc,
            Err(_) => {
                warn!("too many words, extra ignored");
                MAX_ARGS_PER_COMMAND
            }
        };
        if argc == 0 {
            return Ok(());
        }
        let argv = &argv[..argc];

        let cmd = match self.commands.find(argv[0]) {
            Ok(cmd) => cmd,
            Err(e) => {
                writeln!(self.out, "Command '{}' not found or ambiguous.", argv[0])?;
                return Err(e);
            }
        };

        debug!("running '{}'", cmd.name);
        let rv = (cmd.handler)(self, argv);
        if let Err(e) = rv {
            self.report(cmd, e)?;
        }
        rv
    }

    fn report(&mut self, cmd: &ConsoleCommand, e: EcError) -> fmt::Result {
        match e {
            EcError::InvalidParam => writeln!(self.out, "Command usage/param invalid.")?,
            EcError::ParamCount => writeln!(self.out, "Wrong number of params.")?,
            EcError::Param(n) => writeln!(self.out, "Parameter {} invalid.", n)?,
            other => return writeln!(self.out, "Command returned error: {}", other),
        }
        if let Some(argdesc) = cmd.argdesc {
            writeln!(self.out, "Usage: {} {}", cmd.name, argdesc)?;
        }
        Ok(())
    }
}
