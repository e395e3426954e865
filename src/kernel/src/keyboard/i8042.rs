//! Legacy keyboard controller (i8042) emulation.
//!
//! The host talks to two ports: data (0x60) and command (0x64). Each byte
//! goes through [`I8042::handle_data`] or [`I8042::handle_command`] and
//! yields zero or more response bytes for the host. Keyboard-device replies
//! are cached so a `RESEND` can replay them without re-running the command.

use super::{push_byte, scancode, Response, ScanCode};
use ember_common::{
    keyboard::{CommandByte, ScancodeSet},
    EcResult,
};
use ember_hal::HostKeyboardPort;
use log::{debug, trace, warn};

/// Size of the controller RAM image. Byte 0 is the command byte.
pub const CTL_RAM_SIZE: usize = 0x20;

/// Keyboard commands on the data port.
pub mod data_cmd {
    /// Get ID (alias used by some firmware).
    pub const OK_GETID: u8 = 0xe8;
    /// Set LEDs (extended).
    pub const EX_SETLEDS: u8 = 0xeb;
    /// Set LEDs.
    pub const SETLEDS: u8 = 0xed;
    /// Diagnostic echo.
    pub const DIAG_ECHO: u8 = 0xee;
    /// Get or set the scan code set.
    pub const SCANSET: u8 = 0xf0;
    /// Get keyboard ID.
    pub const GETID: u8 = 0xf2;
    /// Set typematic rate and delay.
    pub const SETREP: u8 = 0xf3;
    /// Enable scanning.
    pub const ENABLE: u8 = 0xf4;
    /// Reset to defaults and disable.
    pub const RESET_DIS: u8 = 0xf5;
    /// Reset to defaults.
    pub const RESET_DEF: u8 = 0xf6;
    /// Resend the last reply.
    pub const RESEND: u8 = 0xfe;
    /// Reset and run the basic assurance test.
    pub const RESET_BAT: u8 = 0xff;
}

/// Controller commands on the command port.
pub mod ctl_cmd {
    /// Read controller RAM byte 0.
    pub const READ_CMD_BYTE: u8 = 0x20;
    /// Last read-RAM command.
    pub const READ_CTL_RAM_END: u8 = 0x3f;
    /// Write controller RAM byte 0; the value follows on the data port.
    pub const WRITE_CMD_BYTE: u8 = 0x60;
    /// Last write-RAM command.
    pub const WRITE_CTL_RAM_END: u8 = 0x7f;
    /// Disable the aux interface.
    pub const DIS_MOUSE: u8 = 0xa7;
    /// Enable the aux interface.
    pub const ENA_MOUSE: u8 = 0xa8;
    /// Test the aux interface.
    pub const TEST_MOUSE: u8 = 0xa9;
    /// Controller self test.
    pub const RESET_SELF_TEST: u8 = 0xaa;
    /// Test the keyboard interface.
    pub const TEST_KB_PORT: u8 = 0xab;
    /// Disable the keyboard interface.
    pub const DIS_KB: u8 = 0xad;
    /// Enable the keyboard interface.
    pub const ENA_KB: u8 = 0xae;
    /// Next data byte is echoed back as if it came from the aux device.
    pub const ECHO_MOUSE: u8 = 0xd3;
    /// Next data byte goes to the aux device.
    pub const SEND_TO_MOUSE: u8 = 0xd4;
    /// First pulse-output command.
    pub const PULSE_START: u8 = 0xf0;
    /// Last pulse-output command.
    pub const PULSE_END: u8 = 0xfd;
}

/// Acknowledge.
pub const RET_ACK: u8 = 0xfa;
/// Not acknowledged; the host should resend.
pub const RET_NAK: u8 = 0xfe;
/// Basic assurance test passed.
pub const RET_BAT: u8 = 0xaa;
/// Controller self test passed.
pub const RET_SELF_TEST_OK: u8 = 0x55;

/// What the next data-port byte means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPortState {
    /// A keyboard command.
    Normal,
    /// Argument of `SCANSET`.
    AwaitingScancodeSet,
    /// Argument of `SETLEDS`.
    AwaitingLedByte,
    /// Argument of `SETREP`.
    AwaitingTypematic,
    /// Value for controller RAM at the given address.
    AwaitingCommandByte(u8),
    /// Byte to echo back on behalf of the aux device.
    EchoMouse,
    /// Byte for the aux device, which does not exist.
    SendToMouse,
}

/// Typematic rate/delay byte.
///
/// ```text
///    7     6     5     4     3     2     1     0
/// +-----+-----+-----+-----+-----+-----+-----+-----+
/// |  0  |   delay   |     B     |        D        |
/// +-----+-----+-----+-----+-----+-----+-----+-----+
/// ```
///
/// First repeat after `(1 + delay) * 250` ms, then every
/// `2^B * (8 + D) / 240` s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Typematic(u8);

impl Typematic {
    /// 500 ms delay, about 10.9 characters per second.
    pub const DEFAULT: Self = Self(0x2b);

    /// Decode the byte sent after `SETREP`. Bit 7 is ignored.
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte & 0x7f)
    }

    /// The raw byte.
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Delay before the first repeat, in milliseconds.
    pub fn delay_ms(self) -> u32 {
        (1 + u32::from((self.0 >> 5) & 0x3)) * 250
    }

    /// Interval between repeats, in milliseconds.
    pub fn period_ms(self) -> u32 {
        let b = u32::from((self.0 >> 3) & 0x3);
        let d = u32::from(self.0 & 0x7);
        1000 * (1 << b) * (8 + d) / 240
    }
}

impl Default for Typematic {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Controller state.
pub struct I8042 {
    state: DataPortState,
    ctl_ram: [u8; CTL_RAM_SIZE],
    resend: Response,
    scancode_set: ScancodeSet,
    keyboard_enabled: bool,
    typematic: Typematic,
    leds: u8,
}

impl I8042 {
    /// Controller in its power-on state: keyboard disabled, Set 2 selected,
    /// translation on.
    pub fn new() -> Self {
        let mut ctl_ram = [0; CTL_RAM_SIZE];
        ctl_ram[0] = CommandByte::RESET.bits();
        Self {
            state: DataPortState::Normal,
            ctl_ram,
            resend: Response::new(),
            scancode_set: ScancodeSet::Set2,
            keyboard_enabled: false,
            typematic: Typematic::DEFAULT,
            leds: 0,
        }
    }

    /// Current data-port state.
    pub fn state(&self) -> DataPortState {
        self.state
    }

    /// Whether key events are forwarded to the host.
    pub fn is_keyboard_enabled(&self) -> bool {
        self.keyboard_enabled
    }

    /// The command byte (controller RAM byte 0).
    pub fn command_byte(&self) -> CommandByte {
        CommandByte::from_bits_retain(self.ctl_ram[0])
    }

    /// Scan code set selected by the host.
    pub fn scancode_set(&self) -> ScancodeSet {
        self.scancode_set
    }

    /// Select the scan code set, as the host's `SCANSET` would.
    pub fn set_scancode_set(&mut self, set: ScancodeSet) {
        debug!("scancode set {}", set.number());
        self.scancode_set = set;
    }

    /// The set actually emitted: translation forces Set 1.
    pub fn effective_set(&self) -> ScancodeSet {
        if self.command_byte().contains(CommandByte::XLATE) {
            ScancodeSet::Set1
        } else {
            self.scancode_set
        }
    }

    /// Current typematic setting.
    pub fn typematic(&self) -> Typematic {
        self.typematic
    }

    /// LED byte last sent by the host.
    pub fn leds(&self) -> u8 {
        self.leds
    }

    /// Scan code bytes for a key transition in the effective set.
    pub fn translate(&self, row: usize, col: usize, pressed: bool) -> EcResult<ScanCode> {
        scancode::translate(row, col, pressed, self.effective_set())
    }

    /// Read controller RAM.
    ///
    /// Panics if `addr` is outside the RAM image.
    pub fn read_ctl_ram(&self, addr: u8) -> u8 {
        assert!(usize::from(addr) < CTL_RAM_SIZE, "ctl ram address {:#x}", addr);
        self.ctl_ram[usize::from(addr)]
    }

    /// Write controller RAM. Writing the command byte applies the keyboard
    /// enable bit and toggles the keyboard IRQ on actual transitions.
    ///
    /// Panics if `addr` is outside the RAM image.
    pub fn update_ctl_ram(&mut self, addr: u8, data: u8, port: &mut dyn HostKeyboardPort) {
        assert!(usize::from(addr) < CTL_RAM_SIZE, "ctl ram address {:#x}", addr);
        let orig = self.ctl_ram[usize::from(addr)];
        self.ctl_ram[usize::from(addr)] = data;
        debug!("ctl ram[{:#04x}] = {:#04x} (was {:#04x})", addr, data, orig);

        if addr != 0 {
            return;
        }
        let orig = CommandByte::from_bits_retain(orig);
        let new = CommandByte::from_bits_retain(data);

        self.keyboard_enable(!new.contains(CommandByte::KBD_DIS), port);

        match (
            orig.contains(CommandByte::ENIRQ1),
            new.contains(CommandByte::ENIRQ1),
        ) {
            (false, true) => port.enable_keyboard_irq(),
            (true, false) => port.disable_keyboard_irq(),
            _ => {}
        }
    }

    /// Enable or disable the keyboard. Disabling drops pending host bytes
    /// and restores the default typematic setting.
    pub fn keyboard_enable(&mut self, enable: bool, port: &mut dyn HostKeyboardPort) {
        if self.keyboard_enabled && !enable {
            self.reset_defaults(port);
        }
        if self.keyboard_enabled != enable {
            debug!("keyboard {}", if enable { "enabled" } else { "disabled" });
        }
        self.keyboard_enabled = enable;
    }

    fn reset_defaults(&mut self, port: &mut dyn HostKeyboardPort) {
        self.typematic = Typematic::DEFAULT;
        port.flush();
    }

    /// Handle one byte written to the data port.
    pub fn handle_data(&mut self, data: u8, port: &mut dyn HostKeyboardPort) -> Response {
        trace!("data {:#04x} in {:?}", data, self.state);
        let mut out = Response::new();
        let mut save_for_resend = true;
        let state = core::mem::replace(&mut self.state, DataPortState::Normal);

        match state {
            DataPortState::AwaitingScancodeSet => match data {
                0 => {
                    push_byte(&mut out, RET_ACK);
                    push_byte(&mut out, self.scancode_set.number());
                }
                n => match ScancodeSet::from_number(n) {
                    Some(set) => {
                        self.set_scancode_set(set);
                        push_byte(&mut out, RET_ACK);
                    }
                    None => {
                        warn!("unsupported scancode set {}", n);
                        push_byte(&mut out, RET_NAK);
                        save_for_resend = false;
                    }
                },
            },

            DataPortState::AwaitingLedByte => {
                self.leds = data;
                push_byte(&mut out, RET_ACK);
            }

            DataPortState::AwaitingTypematic => {
                self.typematic = Typematic::from_byte(data);
                debug!(
                    "typematic delay {} ms, period {} ms",
                    self.typematic.delay_ms(),
                    self.typematic.period_ms()
                );
                push_byte(&mut out, RET_ACK);
            }

            // The rest are controller-level; nothing to resend.
            DataPortState::AwaitingCommandByte(addr) => {
                self.update_ctl_ram(addr, data, port);
                save_for_resend = false;
            }

            DataPortState::EchoMouse => {
                push_byte(&mut out, data);
                save_for_resend = false;
            }

            DataPortState::SendToMouse => {
                debug!("no aux device, dropping {:#04x}", data);
                save_for_resend = false;
            }

            DataPortState::Normal => match data {
                data_cmd::SCANSET => {
                    push_byte(&mut out, RET_ACK);
                    self.state = DataPortState::AwaitingScancodeSet;
                }

                data_cmd::SETLEDS | data_cmd::EX_SETLEDS => {
                    push_byte(&mut out, RET_ACK);
                    self.state = DataPortState::AwaitingLedByte;
                }

                data_cmd::DIAG_ECHO => {
                    push_byte(&mut out, RET_ACK);
                    push_byte(&mut out, data_cmd::DIAG_ECHO);
                }

                data_cmd::GETID | data_cmd::OK_GETID => {
                    push_byte(&mut out, RET_ACK);
                    push_byte(&mut out, 0xab); // regular keyboard
                    push_byte(&mut out, 0x83);
                }

                data_cmd::SETREP => {
                    push_byte(&mut out, RET_ACK);
                    self.state = DataPortState::AwaitingTypematic;
                }

                data_cmd::ENABLE => {
                    push_byte(&mut out, RET_ACK);
                    self.keyboard_enable(true, port);
                }

                data_cmd::RESET_DIS => {
                    push_byte(&mut out, RET_ACK);
                    // Disabling an enabled keyboard already resets it.
                    if self.keyboard_enabled {
                        self.keyboard_enable(false, port);
                    } else {
                        self.reset_defaults(port);
                    }
                }

                data_cmd::RESET_DEF => {
                    push_byte(&mut out, RET_ACK);
                    self.reset_defaults(port);
                }

                data_cmd::RESET_BAT => {
                    push_byte(&mut out, RET_ACK);
                    self.keyboard_enable(false, port);
                    push_byte(&mut out, RET_BAT);
                }

                data_cmd::RESEND => {
                    save_for_resend = false;
                    if self.resend.is_empty() {
                        push_byte(&mut out, RET_ACK);
                    } else {
                        out = self.resend.clone();
                    }
                }

                // Probe bytes some firmware writes to the data port.
                0x60 | 0x45 => {
                    save_for_resend = false;
                }

                _ => {
                    warn!("unsupported i8042 data {:#04x}", data);
                    push_byte(&mut out, RET_NAK);
                    save_for_resend = false;
                }
            },
        }

        if save_for_resend && !out.is_empty() {
            self.resend = out.clone();
        }
        out
    }

    /// Handle one byte written to the command port.
    pub fn handle_command(&mut self, command: u8, port: &mut dyn HostKeyboardPort) -> Response {
        trace!("command {:#04x}", command);
        let mut out = Response::new();

        match command {
            ctl_cmd::READ_CMD_BYTE..=ctl_cmd::READ_CTL_RAM_END => {
                push_byte(&mut out, self.read_ctl_ram(command - ctl_cmd::READ_CMD_BYTE));
            }

            ctl_cmd::WRITE_CMD_BYTE..=ctl_cmd::WRITE_CTL_RAM_END => {
                self.state =
                    DataPortState::AwaitingCommandByte(command - ctl_cmd::WRITE_CMD_BYTE);
            }

            ctl_cmd::DIS_MOUSE => self.update_command_byte(CommandByte::AUX_DIS, true, port),
            ctl_cmd::ENA_MOUSE => self.update_command_byte(CommandByte::AUX_DIS, false, port),
            ctl_cmd::DIS_KB => self.update_command_byte(CommandByte::KBD_DIS, true, port),
            ctl_cmd::ENA_KB => self.update_command_byte(CommandByte::KBD_DIS, false, port),

            ctl_cmd::TEST_MOUSE | ctl_cmd::TEST_KB_PORT => push_byte(&mut out, 0x00), // no error
            ctl_cmd::RESET_SELF_TEST => push_byte(&mut out, RET_SELF_TEST_OK),

            ctl_cmd::ECHO_MOUSE => self.state = DataPortState::EchoMouse,
            ctl_cmd::SEND_TO_MOUSE => self.state = DataPortState::SendToMouse,

            ctl_cmd::PULSE_START..=ctl_cmd::PULSE_END => {
                // Pulse output lines: nothing wired up.
            }

            _ => {
                warn!("unsupported i8042 command {:#04x}", command);
                self.reset_defaults(port);
                push_byte(&mut out, RET_NAK);
                self.state = DataPortState::Normal;
            }
        }
        out
    }

    fn update_command_byte(
        &mut self,
        bit: CommandByte,
        set: bool,
        port: &mut dyn HostKeyboardPort,
    ) {
        let mut byte = self.command_byte();
        byte.set(bit, set);
        self.update_ctl_ram(0, byte.bits(), port);
    }
}

impl Default for I8042 {
    fn default() -> Self {
        Self::new()
    }
}
