//! The line currently being edited.

use crate::config::RX_LINE_SIZE;
use heapless::Vec;

/// Content plus the terminating newline.
const LINE_CAPACITY: usize = RX_LINE_SIZE + 1;

/// Editable line with a cursor.
///
/// Invariant: `ptr <= buf.len()`. Printable input stops at `RX_LINE_SIZE`;
/// the last byte of capacity is kept for the newline, which is only ever
/// appended at the end.
pub struct LineBuffer {
    buf: Vec<u8, LINE_CAPACITY>,
    ptr: usize,
}

impl LineBuffer {
    /// Create an empty line.
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            ptr: 0,
        }
    }

    /// Content length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if the line has no content.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Cursor position.
    pub fn cursor(&self) -> usize {
        self.ptr
    }

    /// Returns true if no more printable characters fit.
    pub fn is_full(&self) -> bool {
        self.buf.len() >= RX_LINE_SIZE
    }

    /// Line content.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Content from the cursor to the end of the line.
    pub fn after_cursor(&self) -> &[u8] {
        &self.buf[self.ptr..]
    }

    /// Insert at the cursor, shifting the tail right. Returns false if full.
    pub fn insert(&mut self, c: u8) -> bool {
        if self.is_full() || self.buf.insert(self.ptr, c).is_err() {
            return false;
        }
        self.ptr += 1;
        true
    }

    /// Append the line terminator, moving the cursor to the end.
    pub fn terminate(&mut self) {
        if self.buf.push(b'\n').is_err() {
            panic!("line terminator does not fit");
        }
        self.ptr = self.buf.len();
    }

    /// Remove the byte before the cursor. Returns false at column 0.
    pub fn remove_before_cursor(&mut self) -> bool {
        if self.ptr == 0 {
            return false;
        }
        self.ptr -= 1;
        self.buf.remove(self.ptr);
        true
    }

    /// Drop everything after the cursor, returning how many bytes went.
    pub fn truncate_at_cursor(&mut self) -> usize {
        let removed = self.buf.len() - self.ptr;
        self.buf.truncate(self.ptr);
        removed
    }

    /// Move the cursor to `pos`, clamped to the content.
    pub fn set_cursor(&mut self, pos: usize) {
        self.ptr = pos.min(self.buf.len());
    }

    /// Replace the content, leaving the cursor at the end. Input past the
    /// line limit is cut off.
    pub fn replace(&mut self, content: &[u8]) {
        let n = content.len().min(RX_LINE_SIZE);
        self.buf = Vec::from_slice(&content[..n]).unwrap_or_default();
        self.ptr = self.buf.len();
    }

    /// Empty the line.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.ptr = 0;
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// A completed input line, newline included.
#[derive(Clone)]
pub struct Line(Vec<u8, LINE_CAPACITY>);

impl Line {
    pub(crate) fn from_buffer(line: &LineBuffer) -> Self {
        Self(line.buf.clone())
    }

    /// Raw bytes, including the trailing newline.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The line as text. Input bytes are printable ASCII plus the newline,
    /// so this only yields an empty string for a line that is not UTF-8.
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(self.as_bytes()).unwrap_or("")
    }
}

impl core::fmt::Debug for Line {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Line").field(&self.as_str()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(s: &[u8]) -> LineBuffer {
        let mut line = LineBuffer::new();
        for &c in s {
            assert!(line.insert(c));
        }
        line
    }

    #[test]
    fn test_insert_mid_line_shifts_tail() {
        let mut line = filled(b"hllo");
        line.set_cursor(1);
        line.insert(b'e');
        assert_eq!(line.as_bytes(), b"hello");
        assert_eq!(line.cursor(), 2);
        assert_eq!(line.after_cursor(), b"llo");
    }

    #[test]
    fn test_remove_before_cursor() {
        let mut line = filled(b"abc");
        line.set_cursor(2);
        assert!(line.remove_before_cursor());
        assert_eq!(line.as_bytes(), b"ac");
        assert_eq!(line.cursor(), 1);
        line.set_cursor(0);
        assert!(!line.remove_before_cursor());
    }

    #[test]
    fn test_full_line_still_takes_terminator() {
        let mut line = filled(&[b'x'; RX_LINE_SIZE]);
        assert!(line.is_full());
        assert!(!line.insert(b'y'));
        line.terminate();
        assert_eq!(line.len(), RX_LINE_SIZE + 1);
        assert_eq!(Line::from_buffer(&line).as_bytes().last(), Some(&b'\n'));
    }

    #[test]
    fn test_truncate_and_replace() {
        let mut line = filled(b"status all");
        line.set_cursor(6);
        assert_eq!(line.truncate_at_cursor(), 4);
        assert_eq!(line.as_bytes(), b"status");

        line.replace(b"help");
        assert_eq!(line.as_bytes(), b"help");
        assert_eq!(line.cursor(), 4);

        line.replace(&[b'z'; RX_LINE_SIZE + 10]);
        assert_eq!(line.len(), RX_LINE_SIZE);
        assert!(line.is_full());
    }
}
