//! Board GPIO signals.
//!
//! Boards describe each [`Signal`] once with a [`SignalInfo`]. The
//! [`SignalTable`] checks at startup that every signal is described exactly
//! once and that its flags make sense, then answers lookups by signal
//! rather than by position.

use ember_common::{gpio::GpioFlags, EcError, EcResult};
use ember_hal::Gpio;
use log::{error, trace};

/// Signals the EC core knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Signal {
    /// Power button, pressed low.
    PowerButtonL,
    /// Lid switch.
    LidOpen,
    /// AC adapter present.
    AcPresent,
    /// Keyboard matrix row change.
    KbRowIrq,
    /// Recovery switch.
    RecoveryL,
    /// Write protect.
    WriteProtect,
    /// Platform controller hub power good.
    PchPwrok,
    /// Power LED.
    PowerLed,
}

impl Signal {
    /// Number of signals.
    pub const COUNT: usize = 8;

    /// Every signal, in index order.
    pub const ALL: [Signal; Self::COUNT] = [
        Signal::PowerButtonL,
        Signal::LidOpen,
        Signal::AcPresent,
        Signal::KbRowIrq,
        Signal::RecoveryL,
        Signal::WriteProtect,
        Signal::PchPwrok,
        Signal::PowerLed,
    ];

    /// Position in [`Signal::ALL`], also the index passed to [`Gpio`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Interrupt handler for a signal.
pub type SignalHandler = fn(Signal);

/// Board description of one signal.
#[derive(Debug, Clone, Copy)]
pub struct SignalInfo {
    /// Which signal this describes.
    pub signal: Signal,
    /// Name for logs and the console.
    pub name: &'static str,
    /// Direction, pulls and interrupt edges.
    pub flags: GpioFlags,
    /// Called on an edge; required exactly when an edge is configured.
    pub handler: Option<SignalHandler>,
}

impl SignalInfo {
    fn validate(&self) -> EcResult<()> {
        let flags = self.flags;
        let ok = flags.intersects(GpioFlags::INPUT | GpioFlags::OUTPUT)
            && !flags.contains(GpioFlags::PULL_UP | GpioFlags::PULL_DOWN)
            && (!flags.is_interrupt() || flags.contains(GpioFlags::INPUT))
            && (!flags.contains(GpioFlags::OPEN_DRAIN) || flags.contains(GpioFlags::OUTPUT))
            && flags.is_interrupt() == self.handler.is_some();
        if !ok {
            error!("gpio {}: inconsistent flags {:?}", self.name, flags);
            return Err(EcError::InvalidParam);
        }
        Ok(())
    }
}

/// Validated signal descriptions, indexed by [`Signal`].
pub struct SignalTable {
    signals: [SignalInfo; Signal::COUNT],
}

impl SignalTable {
    /// Build the table from board descriptions, in any order.
    ///
    /// Fails with `NotFound` if a signal is missing and `InvalidParam` if
    /// one is described twice or has inconsistent flags.
    pub fn new(infos: &[SignalInfo]) -> EcResult<Self> {
        let mut position = [None; Signal::COUNT];
        for (i, info) in infos.iter().enumerate() {
            info.validate()?;
            let slot = &mut position[info.signal.index()];
            if slot.is_some() {
                error!("gpio {:?} described twice", info.signal);
                return Err(EcError::InvalidParam);
            }
            *slot = Some(i);
        }

        let mut order = [0; Signal::COUNT];
        for (signal, (dst, src)) in Signal::ALL.iter().zip(order.iter_mut().zip(position)) {
            *dst = src.ok_or_else(|| {
                error!("gpio {:?} not described", signal);
                EcError::NotFound
            })?;
        }

        Ok(Self {
            signals: core::array::from_fn(|i| infos[order[i]]),
        })
    }

    /// Description of `signal`.
    pub fn info(&self, signal: Signal) -> &SignalInfo {
        &self.signals[signal.index()]
    }

    /// Look a signal up by name, ignoring case.
    pub fn find(&self, name: &str) -> Option<Signal> {
        self.signals
            .iter()
            .find(|info| info.name.eq_ignore_ascii_case(name))
            .map(|info| info.signal)
    }

    /// Electrical level of `signal`.
    pub fn get_level(&self, gpio: &impl Gpio, signal: Signal) -> bool {
        gpio.get_level(signal.index())
    }

    /// Whether `signal` is asserted, honoring `ACTIVE_LOW`.
    pub fn is_asserted(&self, gpio: &impl Gpio, signal: Signal) -> bool {
        let active_low = self.info(signal).flags.contains(GpioFlags::ACTIVE_LOW);
        self.get_level(gpio, signal) != active_low
    }

    /// Drive `signal`. Only outputs can be driven.
    pub fn set_level(&self, gpio: &mut impl Gpio, signal: Signal, high: bool) -> EcResult<()> {
        if !self.info(signal).flags.contains(GpioFlags::OUTPUT) {
            return Err(EcError::InvalidParam);
        }
        trace!("gpio {} = {}", self.info(signal).name, u8::from(high));
        gpio.set_level(signal.index(), high);
        Ok(())
    }

    /// Run the handler for an edge on `signal`.
    pub fn dispatch_interrupt(&self, signal: Signal) -> EcResult<()> {
        let handler = self.info(signal).handler.ok_or(EcError::Unimplemented)?;
        handler(signal);
        Ok(())
    }
}
