//! ANSI escape sequence recognizer.

/// Where we are inside an `ESC ...` sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscState {
    /// Not in an escape sequence.
    #[default]
    Outside,
    /// Got ESC.
    Start,
    /// Unrecognized sequence; swallow bytes until a terminator.
    Bad,
    /// Got `ESC [`.
    Bracket,
    /// Got `ESC [ 1`.
    Bracket1,
    /// Got `ESC [ 3`.
    Bracket3,
    /// Got `ESC O`.
    O,
}

/// Editing action named by a complete escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscAction {
    /// Up arrow.
    HistoryPrev,
    /// Down arrow.
    HistoryNext,
    /// Right arrow.
    CursorRight,
    /// Left arrow.
    CursorLeft,
    /// `ESC [ 1 ~`.
    Home,
    /// `ESC O F`.
    End,
    /// `ESC [ 3 ~`.
    Delete,
}

impl EscState {
    /// Returns true while inside a sequence.
    pub fn is_active(self) -> bool {
        self != EscState::Outside
    }

    /// Consume one byte of a sequence. Returns the next state and the action
    /// completed by this byte, if any.
    pub fn advance(self, c: u8) -> (EscState, Option<EscAction>) {
        let action = match (self, c) {
            (EscState::Start, b'[') => return (EscState::Bracket, None),
            (EscState::Start, b'O') => return (EscState::O, None),
            (EscState::Bracket, b'1') => return (EscState::Bracket1, None),
            (EscState::Bracket, b'3') => return (EscState::Bracket3, None),
            (EscState::Bracket, b'A') => Some(EscAction::HistoryPrev),
            (EscState::Bracket, b'B') => Some(EscAction::HistoryNext),
            (EscState::Bracket, b'C') => Some(EscAction::CursorRight),
            (EscState::Bracket, b'D') => Some(EscAction::CursorLeft),
            (EscState::O, b'F') => Some(EscAction::End),
            (EscState::Bracket1, b'~') => Some(EscAction::Home),
            (EscState::Bracket3, b'~') => Some(EscAction::Delete),
            _ => None,
        };

        let next = if c.is_ascii_alphabetic() || c == b'~' {
            EscState::Outside
        } else {
            EscState::Bad
        };
        (next, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(seq: &[u8]) -> (EscState, Option<EscAction>) {
        let mut state = EscState::Start;
        let mut last = None;
        for &c in seq {
            let (next, action) = state.advance(c);
            state = next;
            last = action.or(last);
        }
        (state, last)
    }

    #[test]
    fn test_known_sequences() {
        assert_eq!(run(b"[A"), (EscState::Outside, Some(EscAction::HistoryPrev)));
        assert_eq!(run(b"[B"), (EscState::Outside, Some(EscAction::HistoryNext)));
        assert_eq!(run(b"[C"), (EscState::Outside, Some(EscAction::CursorRight)));
        assert_eq!(run(b"[D"), (EscState::Outside, Some(EscAction::CursorLeft)));
        assert_eq!(run(b"[1~"), (EscState::Outside, Some(EscAction::Home)));
        assert_eq!(run(b"[3~"), (EscState::Outside, Some(EscAction::Delete)));
        assert_eq!(run(b"OF"), (EscState::Outside, Some(EscAction::End)));
    }

    #[test]
    fn test_unknown_sequence_is_swallowed() {
        // ESC [ 2 4 ~ (F12): digits go Bad, the tilde terminates silently.
        assert_eq!(run(b"[24"), (EscState::Bad, None));
        assert_eq!(run(b"[24~"), (EscState::Outside, None));
        // ESC [ Z: terminated, no action.
        assert_eq!(run(b"[Z"), (EscState::Outside, None));
    }
}
