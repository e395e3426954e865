//! Interactive line editor.
//!
//! Bytes from the console are fed in one at a time. The editor keeps the
//! terminal display in sync with the [`LineBuffer`] by echoing characters and
//! cursor-movement escapes, and hands back each completed line.

use super::{
    escape::{EscAction, EscState},
    history::History,
    line::{Line, LineBuffer},
};
use crate::{config::PROMPT, uart::UartWriter};
use alloc::vec::Vec;

const BACKSPACE: u8 = 0x08;
const DEL: u8 = 0x7f;
const ESC: u8 = 0x1b;

/// ASCII control character, e.g. `ctrl(b'C')` is ^C.
const fn ctrl(c: u8) -> u8 {
    c - b'@'
}

/// Sink for terminal echo. Echo bypasses newline translation.
pub trait Echo {
    /// Emit bytes to the terminal.
    fn echo(&mut self, bytes: &[u8]);

    /// Emit one byte.
    fn echo_byte(&mut self, c: u8) {
        self.echo(&[c]);
    }

    /// Emit `c` `n` times.
    fn repeat(&mut self, c: u8, n: usize) {
        for _ in 0..n {
            self.echo_byte(c);
        }
    }
}

impl Echo for Vec<u8> {
    fn echo(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

impl Echo for UartWriter<'_> {
    fn echo(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.uart().write_raw(b);
        }
    }
}

/// Emit `ESC [ n <dir>`.
fn echo_cursor_move(out: &mut impl Echo, n: usize, dir: u8) {
    let mut digits = [0u8; 20];
    let mut i = digits.len();
    let mut v = n;
    loop {
        i -= 1;
        digits[i] = b'0' + (v % 10) as u8;
        v /= 10;
        if v == 0 {
            break;
        }
    }
    out.echo(&[ESC, b'[']);
    out.echo(&digits[i..]);
    out.echo_byte(dir);
}

/// Console line editor state.
pub struct LineEditor {
    line: LineBuffer,
    history: History,
    esc: EscState,
    last_was_cr: bool,
}

impl LineEditor {
    /// Create an editor with an empty line and history.
    pub const fn new() -> Self {
        Self {
            line: LineBuffer::new(),
            history: History::new(),
            esc: EscState::Outside,
            last_was_cr: false,
        }
    }

    /// The line being edited.
    pub fn line(&self) -> &LineBuffer {
        &self.line
    }

    /// Saved command lines.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Discard the line being edited, e.g. after input was flushed.
    pub fn discard_line(&mut self) {
        self.line.clear();
        self.esc = EscState::Outside;
    }

    /// Process one received byte, echoing to `out`. Returns the line once a
    /// newline completes it.
    pub fn feed(&mut self, c: u8, out: &mut impl Echo) -> Option<Line> {
        // Translate CR and CRLF to LF
        let c = match c {
            b'\r' => {
                self.last_was_cr = true;
                b'\n'
            }
            b'\n' if self.last_was_cr => {
                self.last_was_cr = false;
                return None;
            }
            _ => {
                self.last_was_cr = false;
                c
            }
        };

        if c == ESC {
            self.esc = EscState::Start;
            return None;
        }
        if self.esc.is_active() {
            let (next, action) = self.esc.advance(c);
            self.esc = next;
            if let Some(action) = action {
                self.apply(action, out);
            }
            return None;
        }

        match c {
            BACKSPACE | DEL => self.backspace(out),
            c if c == ctrl(b'A') => self.move_home(out),
            c if c == ctrl(b'E') => self.move_end(out),
            c if c == ctrl(b'L') => self.reprint(out),
            c if c == ctrl(b'K') => self.kill(out),
            c if c == ctrl(b'N') => self.history.recall_next(&mut self.line, out),
            c if c == ctrl(b'P') => self.history.recall_previous(&mut self.line, out),
            b'\n' => return Some(self.complete(out)),
            0x20..=0x7e => self.insert(c, out),
            _ => {}
        }
        None
    }

    fn apply(&mut self, action: EscAction, out: &mut impl Echo) {
        match action {
            EscAction::HistoryPrev => self.history.recall_previous(&mut self.line, out),
            EscAction::HistoryNext => self.history.recall_next(&mut self.line, out),
            EscAction::CursorRight => self.move_right(out),
            EscAction::CursorLeft => self.move_left(out),
            EscAction::Home => self.move_home(out),
            EscAction::End => self.move_end(out),
            EscAction::Delete => {
                if self.line.cursor() != self.line.len() {
                    self.move_right(out);
                    self.backspace(out);
                }
            }
        }
    }

    fn complete(&mut self, out: &mut impl Echo) -> Line {
        out.echo(b"\r\n");
        self.line.terminate();
        self.history.commit(self.line.as_bytes());
        let done = Line::from_buffer(&self.line);
        self.line.clear();
        done
    }

    fn insert(&mut self, c: u8, out: &mut impl Echo) {
        // On overflow, discard input
        if self.line.is_full() {
            return;
        }
        out.echo_byte(c);
        let tail = self.line.after_cursor();
        out.echo(tail);
        out.repeat(BACKSPACE, tail.len());
        self.line.insert(c);
    }

    fn backspace(&mut self, out: &mut impl Echo) {
        if !self.line.remove_before_cursor() {
            return;
        }
        let tail = self.line.after_cursor();
        out.echo_byte(BACKSPACE);
        out.echo(tail);
        out.echo_byte(b' ');
        out.repeat(BACKSPACE, tail.len() + 1);
    }

    fn kill(&mut self, out: &mut impl Echo) {
        let removed = self.line.truncate_at_cursor();
        out.repeat(b' ', removed);
        out.repeat(BACKSPACE, removed);
    }

    fn reprint(&mut self, out: &mut impl Echo) {
        out.echo_byte(ctrl(b'L'));
        out.echo(PROMPT.as_bytes());
        out.echo(self.line.as_bytes());
        out.repeat(BACKSPACE, self.line.len() - self.line.cursor());
    }

    fn move_right(&mut self, out: &mut impl Echo) {
        if self.line.cursor() != self.line.len() {
            self.line.set_cursor(self.line.cursor() + 1);
            out.echo(b"\x1b[1C");
        }
    }

    fn move_left(&mut self, out: &mut impl Echo) {
        if self.line.cursor() != 0 {
            self.line.set_cursor(self.line.cursor() - 1);
            out.echo(b"\x1b[1D");
        }
    }

    fn move_home(&mut self, out: &mut impl Echo) {
        let ptr = self.line.cursor();
        if ptr != 0 {
            echo_cursor_move(out, ptr, b'D');
            self.line.set_cursor(0);
        }
    }

    fn move_end(&mut self, out: &mut impl Echo) {
        let distance = self.line.len() - self.line.cursor();
        if distance != 0 {
            echo_cursor_move(out, distance, b'C');
            self.line.set_cursor(self.line.len());
        }
    }
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::RX_LINE_SIZE, testutil::TerminalModel};
    use alloc::vec;

    fn feed_all(editor: &mut LineEditor, input: &[u8], out: &mut Vec<u8>) -> Vec<Line> {
        input.iter().filter_map(|&c| editor.feed(c, out)).collect()
    }

    #[test]
    fn test_help_newline() {
        let mut editor = LineEditor::new();
        let mut out = Vec::new();
        let lines = feed_all(&mut editor, b"help\n", &mut out);
        assert_eq!(out, b"help\r\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_bytes(), b"help\n");
        assert!(editor.line().is_empty());
    }

    #[test]
    fn test_crlf_is_one_newline() {
        let mut editor = LineEditor::new();
        let mut out = Vec::new();
        let lines = feed_all(&mut editor, b"a\r\nb\r\r", &mut out);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].as_str(), "a\n");
        assert_eq!(lines[1].as_str(), "b\n");
        assert_eq!(lines[2].as_str(), "\n");
    }

    #[test]
    fn test_typing_then_backspacing_restores_display() {
        let mut editor = LineEditor::new();
        let mut out = Vec::new();
        feed_all(&mut editor, b"status", &mut out);
        feed_all(&mut editor, &[BACKSPACE; 3], &mut out);
        feed_all(&mut editor, &[DEL; 3], &mut out);
        assert!(editor.line().is_empty());
        assert_eq!(editor.line().cursor(), 0);

        let mut term = TerminalModel::new();
        term.feed(&out);
        assert_eq!(term.cursor(), 0);
        assert_eq!(term.text().trim_end(), "");
    }

    #[test]
    fn test_insert_in_middle_redraws_tail() {
        let mut editor = LineEditor::new();
        let mut out = Vec::new();
        feed_all(&mut editor, b"hllo\x1b[D\x1b[D\x1b[De", &mut out);
        assert_eq!(editor.line().as_bytes(), b"hello");
        assert_eq!(editor.line().cursor(), 2);

        let mut term = TerminalModel::new();
        term.feed(&out);
        assert_eq!(term.text(), "hello");
        assert_eq!(term.cursor(), 2);
    }

    #[test]
    fn test_home_end_and_kill() {
        let mut editor = LineEditor::new();
        let mut out = Vec::new();
        feed_all(&mut editor, b"abcdef", &mut out);
        out.clear();

        feed_all(&mut editor, &[ctrl(b'A')], &mut out);
        assert_eq!(out, b"\x1b[6D");
        feed_all(&mut editor, b"\x1bOF", &mut out);
        assert_eq!(editor.line().cursor(), 6);

        feed_all(&mut editor, b"\x1b[1~\x1b[C\x1b[C", &mut out);
        assert_eq!(editor.line().cursor(), 2);
        feed_all(&mut editor, &[ctrl(b'K')], &mut out);
        assert_eq!(editor.line().as_bytes(), b"ab");
        assert!(out.ends_with(b"    \x08\x08\x08\x08"));
    }

    #[test]
    fn test_delete_key_removes_under_cursor() {
        let mut editor = LineEditor::new();
        let mut out = Vec::new();
        feed_all(&mut editor, b"abc\x01\x1b[3~", &mut out);
        assert_eq!(editor.line().as_bytes(), b"bc");
        assert_eq!(editor.line().cursor(), 0);

        // Delete at end of line does nothing.
        feed_all(&mut editor, b"\x05", &mut out);
        let before = out.len();
        feed_all(&mut editor, b"\x1b[3~", &mut out);
        assert_eq!(out.len(), before);
        assert_eq!(editor.line().as_bytes(), b"bc");
    }

    #[test]
    fn test_reprint() {
        let mut editor = LineEditor::new();
        let mut out = Vec::new();
        feed_all(&mut editor, b"ver\x1b[D", &mut out);
        out.clear();
        feed_all(&mut editor, &[ctrl(b'L')], &mut out);
        assert_eq!(out, b"\x0c> ver\x08");
    }

    #[test]
    fn test_unknown_escape_is_silent() {
        let mut editor = LineEditor::new();
        let mut out = Vec::new();
        feed_all(&mut editor, b"x\x1b[24~\x1b[Zy", &mut out);
        assert_eq!(out, b"xy");
        assert_eq!(editor.line().as_bytes(), b"xy");
    }

    #[test]
    fn test_overflow_discards_without_echo() {
        let mut editor = LineEditor::new();
        let mut out = Vec::new();
        let input = vec![b'k'; RX_LINE_SIZE + 5];
        feed_all(&mut editor, &input, &mut out);
        assert_eq!(out.len(), RX_LINE_SIZE);
        let lines = feed_all(&mut editor, b"\r", &mut out);
        assert_eq!(lines[0].as_bytes().len(), RX_LINE_SIZE + 1);
    }

    #[test]
    fn test_arrow_up_recalls_previous_command() {
        let mut editor = LineEditor::new();
        let mut out = Vec::new();
        feed_all(&mut editor, b"kbstate\r", &mut out);
        feed_all(&mut editor, b"he", &mut out);
        feed_all(&mut editor, b"\x1b[A", &mut out);
        assert_eq!(editor.line().as_bytes(), b"kbstate");

        feed_all(&mut editor, &[ctrl(b'N')], &mut out);
        assert_eq!(editor.line().as_bytes(), b"he");

        let lines = feed_all(&mut editor, b"\x10\r", &mut out);
        assert_eq!(lines[0].as_str(), "kbstate\n");
        assert_eq!(editor.history().len(), 2);
    }
}
