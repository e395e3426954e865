//! Built-in console commands.

use super::command::{CommandTable, ConsoleCommand, Shell};
use crate::{
    config::RX_LINE_SIZE,
    keyboard::commands::{command_codeset, command_ctrlram},
};
use core::fmt::Write;
use ember_common::{EcError, EcResult};

const HELP_COLUMNS: usize = 5;

/// `help [list | <name>]`.
pub fn command_help(shell: &mut Shell<'_>, argv: &[&str]) -> EcResult<()> {
    let commands = shell.commands.commands();

    if let [_, arg] = argv {
        if arg.eq_ignore_ascii_case("list") {
            writeln!(shell.out, "Known commands:")?;
            for cmd in commands {
                writeln!(shell.out, "  {:<15}{}", cmd.name, cmd.shorthelp)?;
            }
            writeln!(shell.out, "HELP CMD = help on CMD.")?;
            return Ok(());
        }

        let cmd = match shell.commands.find(arg) {
            Ok(cmd) => cmd,
            Err(e) => {
                writeln!(shell.out, "Command '{}' not found or ambiguous.", arg)?;
                return Err(e);
            }
        };
        writeln!(shell.out, "Usage: {} {}", cmd.name, cmd.argdesc.unwrap_or(""))?;
        if !cmd.shorthelp.is_empty() {
            writeln!(shell.out, "{}", cmd.shorthelp)?;
        }
        return Ok(());
    }

    // Column-major, like `ls`.
    let rows = commands.len().div_ceil(HELP_COLUMNS);
    writeln!(shell.out, "Known commands:")?;
    for row in 0..rows {
        write!(shell.out, "  ")?;
        for cmd in commands.iter().skip(row).step_by(rows.max(1)) {
            write!(shell.out, "{:<15}", cmd.name)?;
        }
        writeln!(shell.out)?;
    }
    writeln!(shell.out, "HELP LIST = more info; HELP CMD = help on CMD.")?;
    Ok(())
}

/// `history`: saved command lines, oldest first.
pub fn command_history(shell: &mut Shell<'_>, _argv: &[&str]) -> EcResult<()> {
    let history = shell.history.ok_or(EcError::Unimplemented)?;
    let mut entry = [0; RX_LINE_SIZE];
    for n in 0..history.len() {
        let Some(len) = history.copy_entry(n, &mut entry) else {
            break;
        };
        let line = core::str::from_utf8(&entry[..len]).unwrap_or("?");
        writeln!(shell.out, "{:3} {}", n, line)?;
    }
    Ok(())
}

/// `kbstate`: pressed rows per column from the last scan.
pub fn command_kbstate(shell: &mut Shell<'_>, _argv: &[&str]) -> EcResult<()> {
    let matrix = shell.matrix.ok_or(EcError::Unimplemented)?;
    write!(shell.out, "Keyboard raw state:")?;
    for rows in matrix {
        write!(shell.out, " {:02x}", rows)?;
    }
    writeln!(shell.out)?;
    Ok(())
}

static BUILTIN_COMMANDS: [ConsoleCommand; 5] = [
    ConsoleCommand {
        name: "codeset",
        handler: command_codeset,
        argdesc: Some("[set]"),
        shorthelp: "Select keyboard codeset",
    },
    ConsoleCommand {
        name: "ctrlram",
        handler: command_ctrlram,
        argdesc: Some("[ctrlram_index [value]]"),
        shorthelp: "Get/set keyboard controller RAM",
    },
    ConsoleCommand {
        name: "help",
        handler: command_help,
        argdesc: Some("[ list | <name> ]"),
        shorthelp: "Print command help",
    },
    ConsoleCommand {
        name: "history",
        handler: command_history,
        argdesc: None,
        shorthelp: "Print console history",
    },
    ConsoleCommand {
        name: "kbstate",
        handler: command_kbstate,
        argdesc: None,
        shorthelp: "Show keyboard matrix state",
    },
];

/// The built-in command set.
pub static DEFAULT_COMMANDS: CommandTable = CommandTable::new(&BUILTIN_COMMANDS);
