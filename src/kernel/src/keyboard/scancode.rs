//! Matrix position to scan code translation.
//!
//! One table holds both code sets side by side, so a key can never be
//! remapped in one set and forgotten in the other.

use super::{push_byte, ScanCode};
use crate::config::{KB_COLS, KB_ROWS};
use ember_common::{keyboard::ScancodeSet, EcError, EcResult};

/// Make codes of one key: `(set 1, set 2)`. Extended keys carry the `0xE0`
/// prefix in the high byte. Zero means no key at this position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyCodes(u16, u16);

const fn k(set1: u16, set2: u16) -> KeyCodes {
    KeyCodes(set1, set2)
}

const ____: KeyCodes = KeyCodes(0, 0);

#[rustfmt::skip]
static MAKE_CODES: [[KeyCodes; KB_COLS]; KB_ROWS] = [
    [____, k(0xe05b, 0xe01f), k(0x003b, 0x0005), k(0x0030, 0x0032), k(0x0044, 0x0009),
     k(0x0073, 0x0051), k(0x0031, 0x0031), ____, k(0x000d, 0x0055), ____,
     k(0xe038, 0xe011), ____, ____],
    [____, k(0x0001, 0x0076), k(0x003e, 0x000c), k(0x0022, 0x0034), k(0x0041, 0x0083),
     ____, k(0x0023, 0x0033), ____, k(0x0028, 0x0052), k(0x0043, 0x0001),
     ____, k(0x000e, 0x0066), k(0x0078, 0x0067)],
    [k(0x001d, 0x0014), k(0x000f, 0x000d), k(0x003d, 0x0004), k(0x0014, 0x002c), k(0x0040, 0x000b),
     k(0x001b, 0x005b), k(0x0015, 0x0035), k(0x0056, 0x0061), k(0x001a, 0x0054), k(0x0042, 0x000a),
     k(0x0073, 0x0051), ____, ____],
    [____, k(0x0029, 0x000e), k(0x003c, 0x0006), k(0x0006, 0x002e), k(0x003f, 0x0003),
     ____, k(0x0007, 0x0036), ____, k(0x000c, 0x004e), ____,
     ____, k(0x002b, 0x005d), k(0x0079, 0x0064)],
    [k(0xe01d, 0xe014), k(0x001e, 0x001c), k(0x0020, 0x0023), k(0x0021, 0x002b), k(0x001f, 0x001b),
     k(0x0025, 0x0042), k(0x0024, 0x003b), ____, k(0x0027, 0x004c), k(0x0026, 0x004b),
     k(0x002b, 0x005d), k(0x001c, 0x005a), ____],
    [____, k(0x002c, 0x001a), k(0x002e, 0x0021), k(0x002f, 0x002a), k(0x002d, 0x0022),
     k(0x0033, 0x0041), k(0x0032, 0x003a), k(0x002a, 0x0012), k(0x0035, 0x004a), k(0x0034, 0x0049),
     ____, k(0x0039, 0x0029), ____],
    [____, k(0x0002, 0x0016), k(0x0004, 0x0026), k(0x0005, 0x0025), k(0x0003, 0x001e),
     k(0x0009, 0x003e), k(0x0008, 0x003d), ____, k(0x000b, 0x0045), k(0x000a, 0x0046),
     k(0x0038, 0x0011), k(0xe050, 0xe072), k(0xe04d, 0xe074)],
    [____, k(0x0010, 0x0015), k(0x0012, 0x0024), k(0x0013, 0x002d), k(0x0011, 0x001d),
     k(0x0017, 0x0043), k(0x0016, 0x003c), k(0x0036, 0x0059), k(0x0019, 0x004d), k(0x0018, 0x0044),
     ____, k(0xe048, 0xe075), k(0xe04b, 0xe06b)],
];

/// Table make code for a key in `set`.
///
/// `InvalidParam` if the position is outside the matrix, `Unimplemented` if
/// no key sits there.
pub fn make_code(row: usize, col: usize, set: ScancodeSet) -> EcResult<u16> {
    let codes = MAKE_CODES
        .get(row)
        .and_then(|r| r.get(col))
        .ok_or(EcError::InvalidParam)?;
    let code = match set {
        ScancodeSet::Set1 => codes.0,
        ScancodeSet::Set2 => codes.1,
    };
    if code == 0 {
        return Err(EcError::Unimplemented);
    }
    Ok(code)
}

/// Bytes the host sees for a key transition.
///
/// Set 1 marks a release by setting bit 7 of the last byte. Set 2 puts the
/// `0xF0` break prefix directly before the last byte, so an extended key
/// releases as `E0 F0 xx`.
pub fn translate(row: usize, col: usize, pressed: bool, set: ScancodeSet) -> EcResult<ScanCode> {
    let code = make_code(row, col, set)?;

    let mut bytes = ScanCode::new();
    if code > 0xff {
        push_byte(&mut bytes, (code >> 8) as u8);
    }
    push_byte(&mut bytes, code as u8);

    if !pressed {
        let last = bytes.len() - 1;
        match set {
            ScancodeSet::Set1 => bytes[last] |= 0x80,
            ScancodeSet::Set2 => {
                if bytes.insert(last, 0xf0).is_err() {
                    panic!("byte sequence overflow");
                }
            }
        }
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_common::keyboard::ScancodeSet::{Set1, Set2};

    const ESC: (usize, usize) = (1, 1);
    const KEY_A: (usize, usize) = (4, 1);
    const UP: (usize, usize) = (7, 11);
    const RIGHT_ALT: (usize, usize) = (0, 10);

    fn bytes(pos: (usize, usize), pressed: bool, set: ScancodeSet) -> EcResult<std::vec::Vec<u8>> {
        translate(pos.0, pos.1, pressed, set).map(|c| c.to_vec())
    }

    #[test]
    fn test_set1_make_and_break() {
        assert_eq!(bytes(ESC, true, Set1), Ok(vec![0x01]));
        assert_eq!(bytes(ESC, false, Set1), Ok(vec![0x81]));
        assert_eq!(bytes(KEY_A, true, Set1), Ok(vec![0x1e]));
        assert_eq!(bytes(KEY_A, false, Set1), Ok(vec![0x9e]));
        assert_eq!(bytes(UP, true, Set1), Ok(vec![0xe0, 0x48]));
        assert_eq!(bytes(UP, false, Set1), Ok(vec![0xe0, 0xc8]));
    }

    #[test]
    fn test_set2_make_and_break() {
        assert_eq!(bytes(ESC, true, Set2), Ok(vec![0x76]));
        assert_eq!(bytes(ESC, false, Set2), Ok(vec![0xf0, 0x76]));
        assert_eq!(bytes(KEY_A, false, Set2), Ok(vec![0xf0, 0x1c]));
        assert_eq!(bytes(RIGHT_ALT, true, Set2), Ok(vec![0xe0, 0x11]));
        assert_eq!(bytes(RIGHT_ALT, false, Set2), Ok(vec![0xe0, 0xf0, 0x11]));
    }

    #[test]
    fn test_empty_cell_is_unimplemented_in_both_sets() {
        for set in [Set1, Set2] {
            assert_eq!(translate(0, 0, true, set), Err(EcError::Unimplemented));
            assert_eq!(translate(0, 0, false, set), Err(EcError::Unimplemented));
        }
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(make_code(KB_ROWS, 0, Set1), Err(EcError::InvalidParam));
        assert_eq!(make_code(0, KB_COLS, Set2), Err(EcError::InvalidParam));
    }

    #[test]
    fn test_sets_agree_on_which_cells_exist() {
        for (r, row) in MAKE_CODES.iter().enumerate() {
            for (c, codes) in row.iter().enumerate() {
                assert_eq!(codes.0 == 0, codes.1 == 0, "cell ({}, {})", r, c);
            }
        }
    }
}
