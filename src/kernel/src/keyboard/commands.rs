//! Keyboard console commands.

use super::i8042::CTL_RAM_SIZE;
use crate::console::{parse_u8_arg, Shell};
use core::fmt::Write;
use ember_common::{
    keyboard::{CommandByte, ScancodeSet},
    EcError, EcResult,
};

/// `codeset [<set>]`: show or select the scan code set.
pub fn command_codeset(shell: &mut Shell<'_>, argv: &[&str]) -> EcResult<()> {
    let kb = shell.keyboard.as_mut().ok_or(EcError::Unimplemented)?;

    match argv.len() {
        1 => {
            let xlate = kb.i8042.command_byte().contains(CommandByte::XLATE);
            writeln!(shell.out, "Current scancode set: {}", kb.i8042.scancode_set().number())?;
            writeln!(shell.out, "I8042_XLATE: {}", u8::from(xlate))?;
        }
        2 => {
            let n = parse_u8_arg(argv, 1)?;
            let Some(set) = ScancodeSet::from_number(n) else {
                writeln!(shell.out, "Scancode {} is NOT supported.", n)?;
                return Err(EcError::Param(1));
            };
            kb.i8042.set_scancode_set(set);
            writeln!(shell.out, "Set scancode set to {}", set.number())?;
        }
        _ => return Err(EcError::ParamCount),
    }
    Ok(())
}

/// `ctrlram <index> [<value>]`: read or write controller RAM.
///
/// Writes go through the same path as the host's, so the command byte's
/// enable and IRQ bits take effect.
pub fn command_ctrlram(shell: &mut Shell<'_>, argv: &[&str]) -> EcResult<()> {
    let kb = shell.keyboard.as_mut().ok_or(EcError::Unimplemented)?;
    if !(2..=3).contains(&argv.len()) {
        return Err(EcError::ParamCount);
    }

    let index = parse_u8_arg(argv, 1)?;
    writeln!(shell.out, "Controller RAM index = {}", index)?;
    if usize::from(index) >= CTL_RAM_SIZE {
        writeln!(shell.out, "Index is out of range (0x00-0x1f).")?;
        return Err(EcError::Param(1));
    }

    if argv.len() == 3 {
        let data = parse_u8_arg(argv, 2)?;
        kb.i8042.update_ctl_ram(index, data, &mut *kb.port);
        writeln!(shell.out, "Write ctlram[{}] as 0x{:02x}.", index, data)?;
    } else {
        let data = kb.i8042.read_ctl_ram(index);
        writeln!(shell.out, "ctlram[{}] is 0x{:02x}.", index, data)?;
    }
    Ok(())
}
