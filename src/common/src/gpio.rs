//! GPIO capability flags.

use bitflags::bitflags;

bitflags! {
    /// Capabilities and electrical configuration of a GPIO signal.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct GpioFlags: u32 {
        const INPUT       = 1 << 0;
        const OUTPUT      = 1 << 1;
        const PULL_UP     = 1 << 2;
        const PULL_DOWN   = 1 << 3;
        const INT_RISING  = 1 << 4;
        const INT_FALLING = 1 << 5;
        const ACTIVE_LOW  = 1 << 6;
        const OPEN_DRAIN  = 1 << 7;
    }
}

impl GpioFlags {
    /// Interrupt on both edges.
    pub const INT_BOTH: Self = Self::INT_RISING.union(Self::INT_FALLING);

    /// Whether any interrupt edge is configured.
    pub fn is_interrupt(self) -> bool {
        self.intersects(Self::INT_BOTH)
    }
}
