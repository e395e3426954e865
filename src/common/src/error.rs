//! System-wide error types for the Ember EC.

use core::fmt;

/// Result alias used across the EC core.
pub type EcResult<T> = Result<T, EcError>;

/// EC error codes.
///
/// Console command handlers report these back to the dispatcher, which turns
/// them into a one-line diagnostic. None of them is fatal to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EcError {
    /// Unspecified failure
    Unknown,
    /// Operation or table entry not implemented
    Unimplemented,
    /// Too much data for the destination (too many words, short write)
    Overflow,
    /// Operation timed out
    Timeout,
    /// Invalid parameter or command usage
    InvalidParam,
    /// Wrong number of parameters
    ParamCount,
    /// Parameter `n` (1-based) is invalid
    Param(u8),
    /// Destination queue is full
    BufferFull,
    /// No such entry
    NotFound,
    /// Name matches more than one entry
    Ambiguous,
    /// One-time initialization already happened
    AlreadyInitialized,
    /// Resource is busy
    Busy,
}

impl EcError {
    /// Error for the `n`th (1-based) parameter, clamped to 1..=9.
    pub fn param(n: usize) -> Self {
        EcError::Param(n.clamp(1, 9) as u8)
    }
}

impl fmt::Display for EcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcError::Unknown => write!(f, "unknown error"),
            EcError::Unimplemented => write!(f, "not implemented"),
            EcError::Overflow => write!(f, "overflow"),
            EcError::Timeout => write!(f, "timed out"),
            EcError::InvalidParam => write!(f, "invalid parameter"),
            EcError::ParamCount => write!(f, "wrong number of parameters"),
            EcError::Param(n) => write!(f, "parameter {} invalid", n),
            EcError::BufferFull => write!(f, "buffer full"),
            EcError::NotFound => write!(f, "not found"),
            EcError::Ambiguous => write!(f, "ambiguous"),
            EcError::AlreadyInitialized => write!(f, "already initialized"),
            EcError::Busy => write!(f, "busy"),
        }
    }
}

/// Console output is written into a bounded ring; a failed write means it
/// filled up.
impl From<fmt::Error> for EcError {
    fn from(_: fmt::Error) -> Self {
        EcError::Overflow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_is_clamped() {
        assert_eq!(EcError::param(0), EcError::Param(1));
        assert_eq!(EcError::param(3), EcError::Param(3));
        assert_eq!(EcError::param(42), EcError::Param(9));
    }

    #[test]
    fn test_fmt_error_maps_to_overflow() {
        assert_eq!(EcError::from(fmt::Error), EcError::Overflow);
    }
}
