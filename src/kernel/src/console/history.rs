//! Command history.
//!
//! Past lines live back to back in a byte ring. A small ring of slots records
//! where each one starts and ends. Slots `tail..head` are valid, oldest
//! first. While the user browses with the arrow keys, the line they were
//! typing is stashed as the newest slot so coming back down restores it.

use super::{editor::Echo, line::LineBuffer};
use crate::config::{HISTORY_BUF_SIZE, HISTORY_SIZE, RX_LINE_SIZE};

const BUF_MASK: usize = HISTORY_BUF_SIZE - 1;
const SLOT_MASK: usize = HISTORY_SIZE - 1;

const _: () = assert!(HISTORY_BUF_SIZE.is_power_of_two() && HISTORY_SIZE.is_power_of_two());
const _: () = assert!(HISTORY_BUF_SIZE > RX_LINE_SIZE);

fn next_slot(i: usize) -> usize {
    (i + 1) & SLOT_MASK
}

fn prev_slot(i: usize) -> usize {
    i.wrapping_sub(1) & SLOT_MASK
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    /// First byte.
    start: usize,
    /// One past the last byte.
    end: usize,
}

impl Slot {
    fn len(self) -> usize {
        self.end.wrapping_sub(self.start) & BUF_MASK
    }
}

/// Saved command lines plus the browse position.
pub struct History {
    slots: [Slot; HISTORY_SIZE],
    /// Next slot to write.
    head: usize,
    /// Oldest valid slot.
    tail: usize,
    /// Slot being browsed; equals `head` when not browsing.
    ptr: usize,
    buf: [u8; HISTORY_BUF_SIZE],
}

impl History {
    /// Create an empty history.
    pub const fn new() -> Self {
        Self {
            slots: [Slot { start: 0, end: 0 }; HISTORY_SIZE],
            head: 0,
            tail: 0,
            ptr: 0,
            buf: [0; HISTORY_BUF_SIZE],
        }
    }

    /// Number of saved entries, counting a stashed in-progress line.
    pub fn len(&self) -> usize {
        self.head.wrapping_sub(self.tail) & SLOT_MASK
    }

    /// Returns true if nothing is saved.
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Returns true while an older entry is loaded into the line.
    pub fn is_browsing(&self) -> bool {
        self.ptr != self.head
    }

    /// Bytes occupied from the start of the oldest entry to the end of the
    /// newest. Never reaches `HISTORY_BUF_SIZE`, see [`History::save_current`].
    fn used(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let newest = self.slots[prev_slot(self.head)];
        newest.end.wrapping_sub(self.slots[self.tail].start) & BUF_MASK
    }

    fn free_space(&self) -> usize {
        HISTORY_BUF_SIZE - self.used()
    }

    /// Append `line` as the newest entry, without its trailing newline.
    ///
    /// Oldest entries are evicted until the bytes fit with at least one byte
    /// to spare, so a full ring stays distinguishable from an empty one. The
    /// oldest is also evicted when every slot is taken.
    pub fn save_current(&mut self, line: &[u8]) {
        let content = line.strip_suffix(b"\n").unwrap_or(line);
        let content = &content[..content.len().min(RX_LINE_SIZE)];
        let len = content.len();

        while !self.is_empty() && self.free_space() <= len {
            self.tail = next_slot(self.tail);
        }

        let start = if self.is_empty() {
            0
        } else {
            self.slots[prev_slot(self.head)].end
        };

        let id = self.head;
        self.head = next_slot(self.head);
        if self.head == self.tail {
            self.tail = next_slot(self.tail);
        }

        for (i, &c) in content.iter().enumerate() {
            self.buf[(start + i) & BUF_MASK] = c;
        }
        self.slots[id] = Slot {
            start,
            end: (start + len) & BUF_MASK,
        };
    }

    /// Browse one entry older (up arrow, Ctrl-P).
    pub fn recall_previous(&mut self, line: &mut LineBuffer, out: &mut impl Echo) {
        if self.ptr == self.tail {
            return;
        }

        if !self.is_browsing() {
            // The stash must not push out the entry we are about to show.
            let newest = self.slots[prev_slot(self.head)].len();
            if newest + line.len() >= HISTORY_BUF_SIZE {
                return;
            }
            self.save_current(line.as_bytes());
        }

        self.ptr = prev_slot(self.ptr);
        self.load(self.ptr, line, out);
    }

    /// Browse one entry newer (down arrow, Ctrl-N).
    pub fn recall_next(&mut self, line: &mut LineBuffer, out: &mut impl Echo) {
        if !self.is_browsing() {
            return;
        }

        self.ptr = next_slot(self.ptr);
        self.load(self.ptr, line, out);

        // Back at the stash: it is the line being edited again.
        if self.ptr == prev_slot(self.head) {
            self.head = self.ptr;
        }
    }

    /// Record a completed line and stop browsing.
    pub fn commit(&mut self, line: &[u8]) {
        if self.is_browsing() {
            self.head = prev_slot(self.head);
        }
        if line != b"\n" {
            self.save_current(line);
        }
        self.ptr = self.head;
    }

    fn copy_slot(&self, slot: Slot, dst: &mut [u8; RX_LINE_SIZE]) -> usize {
        let len = slot.len().min(RX_LINE_SIZE);
        for (i, d) in dst[..len].iter_mut().enumerate() {
            *d = self.buf[(slot.start + i) & BUF_MASK];
        }
        len
    }

    fn load(&mut self, id: usize, line: &mut LineBuffer, out: &mut impl Echo) {
        let mut entry = [0; RX_LINE_SIZE];
        let len = self.copy_slot(self.slots[id], &mut entry);
        let entry = &entry[..len];

        out.repeat(b'\x08', line.cursor());
        out.echo(entry);
        let old_len = line.len();
        if len < old_len {
            out.repeat(b' ', old_len - len);
            out.repeat(b'\x08', old_len - len);
        }
        line.replace(entry);
    }

    /// Copy the `n`th saved entry (0 = oldest) into `dst`, returning its
    /// length.
    pub fn copy_entry(&self, n: usize, dst: &mut [u8; RX_LINE_SIZE]) -> Option<usize> {
        if n >= self.len() {
            return None;
        }
        let id = (self.tail + n) & SLOT_MASK;
        Some(self.copy_slot(self.slots[id], dst))
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{format, string::String, vec::Vec};

    fn entries(history: &History) -> Vec<String> {
        let mut buf = [0; RX_LINE_SIZE];
        (0..history.len())
            .map(|n| {
                let len = history.copy_entry(n, &mut buf).unwrap();
                String::from_utf8(buf[..len].to_vec()).unwrap()
            })
            .collect()
    }

    fn line_of(s: &str) -> LineBuffer {
        let mut line = LineBuffer::new();
        line.replace(s.as_bytes());
        line
    }

    #[test]
    fn test_commit_strips_newline_and_skips_blank() {
        let mut history = History::new();
        history.commit(b"version\n");
        history.commit(b"\n");
        history.commit(b"help\n");
        assert_eq!(entries(&history), ["version", "help"]);
    }

    #[test]
    fn test_slot_ring_evicts_oldest() {
        let mut history = History::new();
        for i in 0..10 {
            history.commit(format!("c{}\n", i).as_bytes());
        }
        assert_eq!(history.len(), HISTORY_SIZE - 1);
        assert_eq!(entries(&history)[0], "c3");
        assert_eq!(entries(&history)[6], "c9");
    }

    #[test]
    fn test_byte_ring_evicts_oldest() {
        let mut history = History::new();
        let long = "x".repeat(60);
        history.commit(format!("{}\n", long).as_bytes());
        history.commit(b"short\n");
        // 60 + 5 + 70 no longer fits with a spare byte.
        let longer = "y".repeat(70);
        history.commit(format!("{}\n", longer).as_bytes());
        assert_eq!(entries(&history), ["short", longer.as_str()]);
    }

    #[test]
    fn test_recall_newest_to_oldest_then_stops() {
        let mut history = History::new();
        for i in 0..10 {
            history.commit(format!("cmd{}\n", i).as_bytes());
        }

        let mut line = LineBuffer::new();
        let mut out = Vec::new();
        // Seven entries are saved; stashing the empty line takes a slot and
        // evicts the oldest, leaving six to browse.
        let mut seen = Vec::new();
        for _ in 0..HISTORY_SIZE - 2 {
            history.recall_previous(&mut line, &mut out);
            seen.push(String::from_utf8(line.as_bytes().to_vec()).unwrap());
        }
        assert_eq!(seen, ["cmd9", "cmd8", "cmd7", "cmd6", "cmd5", "cmd4"]);

        history.recall_previous(&mut line, &mut out);
        assert_eq!(line.as_bytes(), b"cmd4");
    }

    #[test]
    fn test_next_restores_stashed_line() {
        let mut history = History::new();
        history.commit(b"first\n");
        history.commit(b"second\n");

        let mut line = line_of("draft");
        let mut out = Vec::new();
        history.recall_previous(&mut line, &mut out);
        history.recall_previous(&mut line, &mut out);
        assert_eq!(line.as_bytes(), b"first");

        history.recall_next(&mut line, &mut out);
        assert_eq!(line.as_bytes(), b"second");
        history.recall_next(&mut line, &mut out);
        assert_eq!(line.as_bytes(), b"draft");
        assert!(!history.is_browsing());

        // Stash was removed: repeated up/down does not duplicate it.
        history.recall_next(&mut line, &mut out);
        assert_eq!(line.as_bytes(), b"draft");
        assert_eq!(entries(&history), ["first", "second"]);
    }

    #[test]
    fn test_commit_while_browsing_drops_stash() {
        let mut history = History::new();
        history.commit(b"one\n");
        let mut line = line_of("tw");
        let mut out = Vec::new();
        history.recall_previous(&mut line, &mut out);
        assert_eq!(history.len(), 2);

        line.terminate();
        history.commit(line.as_bytes());
        assert_eq!(entries(&history), ["one", "one"]);
        assert!(!history.is_browsing());
    }

    #[test]
    fn test_load_blanks_leftover_text() {
        let mut history = History::new();
        history.commit(b"ab\n");
        let mut line = line_of("wxyz");
        line.set_cursor(3);
        let mut out = Vec::new();
        history.recall_previous(&mut line, &mut out);
        assert_eq!(out, b"\x08\x08\x08ab  \x08\x08");
        assert_eq!(line.as_bytes(), b"ab");
        assert_eq!(line.cursor(), 2);
    }

    #[test]
    fn test_empty_history_recall_is_noop() {
        let mut history = History::new();
        let mut line = line_of("abc");
        let mut out = Vec::new();
        history.recall_previous(&mut line, &mut out);
        history.recall_next(&mut line, &mut out);
        assert!(out.is_empty());
        assert_eq!(line.as_bytes(), b"abc");
        assert!(history.is_empty());
    }
}
