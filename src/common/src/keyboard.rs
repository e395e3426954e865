//! Keyboard protocol types shared with board code.

use bitflags::bitflags;

bitflags! {
    /// Bits of the i8042 command byte (controller RAM byte 0).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct CommandByte: u8 {
        const ENIRQ1    = 1 << 0; // Keyboard IRQ enable
        const ENIRQ12   = 1 << 1; // Aux IRQ enable
        const SYS_FLAG  = 1 << 2;
        const KBD_DIS   = 1 << 4; // Keyboard interface disabled
        const AUX_DIS   = 1 << 5; // Aux interface disabled
        const XLATE     = 1 << 6; // Translate to set 1
    }
}

impl CommandByte {
    /// Command byte value at controller reset.
    pub const RESET: Self = Self::XLATE.union(Self::AUX_DIS).union(Self::KBD_DIS);
}

/// Scan code set reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScancodeSet {
    /// Legacy XT set; release sets bit 7 of the last byte.
    Set1 = 1,
    /// AT set; release is prefixed with 0xF0.
    Set2 = 2,
}

impl ScancodeSet {
    /// Parse the numeric set selector used on the wire and on the console.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(ScancodeSet::Set1),
            2 => Some(ScancodeSet::Set2),
            _ => None,
        }
    }

    /// The numeric selector of this set.
    pub fn number(self) -> u8 {
        self as u8
    }
}
