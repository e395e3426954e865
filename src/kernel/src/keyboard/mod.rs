//! Keyboard matrix scanning and legacy host keyboard emulation.
//!
//! - [`scan`]: drives the matrix and reports key edges
//! - [`scancode`]: turns a (row, column) edge into scan code bytes
//! - [`i8042`]: the controller state machine for host data/command bytes
//! - [`host`]: queues between the host bus interrupt, the controller task
//!   and the host port

use heapless::Vec;

pub mod commands;
pub mod host;
pub mod i8042;
pub mod scan;
pub mod scancode;

/// Append to a byte sequence whose worst case fits by construction.
///
/// Panics on overflow.
pub(crate) fn push_byte<const N: usize>(bytes: &mut Vec<u8, N>, byte: u8) {
    if bytes.push(byte).is_err() {
        panic!("byte sequence overflow");
    }
}

/// Bytes for one key transition. Set 2 extended releases need three.
pub type ScanCode = Vec<u8, 3>;

/// Controller reply to one host byte.
pub type Response = Vec<u8, 4>;

/// A key transition reported by the matrix scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Matrix row.
    pub row: usize,
    /// Matrix column.
    pub col: usize,
    /// True on press, false on release.
    pub pressed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_byte_fills_to_capacity() {
        let mut code = ScanCode::new();
        for b in [0xe0, 0xf0, 0x75] {
            push_byte(&mut code, b);
        }
        assert_eq!(&*code, &[0xe0, 0xf0, 0x75]);
    }

    #[test]
    #[should_panic(expected = "overflow")]
    fn test_overflow_panics() {
        let mut response = Response::new();
        for b in 0..5 {
            push_byte(&mut response, b);
        }
    }
}
