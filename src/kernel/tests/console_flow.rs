//! Bytes in on the UART, echo and command output back out.

use ember_kernel::{
    console::{Console, DEFAULT_COMMANDS},
    keyboard::host::{HostKeyboard, QueuedHostPort},
    sync::AsyncMutex,
    testutil::{block_on, MockSerial},
    uart::ConsoleUart,
};
use ember_hal::HostKeyboardPort;

fn type_bytes<P: HostKeyboardPort>(
    console: &mut Console<'_, P>,
    uart: &ConsoleUart,
    serial: &mut MockSerial,
    bytes: &[u8],
) -> String {
    serial.queue_input(bytes);
    uart.service(serial);
    block_on(console.process());
    uart.service(serial);
    serial.take_output_string()
}

#[test]
fn help_lists_commands() {
    let uart = ConsoleUart::new();
    let mut serial = MockSerial::new();
    let mut console = Console::new(&uart, &DEFAULT_COMMANDS);

    let out = type_bytes(&mut console, &uart, &mut serial, b"help\r");
    assert!(out.starts_with("help\r\nKnown commands:\r\n  codeset"));
    assert!(out.ends_with("HELP LIST = more info; HELP CMD = help on CMD.\r\n> "));
}

#[test]
fn crlf_gives_one_prompt() {
    let uart = ConsoleUart::new();
    let mut serial = MockSerial::new();
    let mut console = Console::new(&uart, &DEFAULT_COMMANDS);

    assert_eq!(type_bytes(&mut console, &uart, &mut serial, b"\r\n"), "\r\n> ");
    assert!(console.editor().history().is_empty());
}

#[test]
fn arrow_up_reruns_previous_command() {
    let uart = ConsoleUart::new();
    let mut serial = MockSerial::new();
    let mut console = Console::new(&uart, &DEFAULT_COMMANDS);

    type_bytes(&mut console, &uart, &mut serial, b"kbstate\r");
    let out = type_bytes(&mut console, &uart, &mut serial, b"\x1b[A");
    assert_eq!(out, "kbstate");

    let out = type_bytes(&mut console, &uart, &mut serial, b"\r");
    assert_eq!(out, "\r\nCommand returned error: not implemented\r\n> ");

    let out = type_bytes(&mut console, &uart, &mut serial, b"hist\r");
    assert_eq!(
        out,
        "hist\r\n  0 kbstate\r\n  1 kbstate\r\n  2 hist\r\n> "
    );
}

#[test]
fn usage_errors_print_hint_and_keep_state() {
    let uart = ConsoleUart::new();
    let mut serial = MockSerial::new();
    let port = QueuedHostPort::new();
    let keyboard = AsyncMutex::new(HostKeyboard::new(&port));
    let mut console = Console::new(&uart, &DEFAULT_COMMANDS).with_keyboard(&keyboard);

    let out = type_bytes(&mut console, &uart, &mut serial, b"ctrlram 0x40\r");
    assert_eq!(
        out,
        "ctrlram 0x40\r\n\
         Controller RAM index = 64\r\n\
         Index is out of range (0x00-0x1f).\r\n\
         Parameter 1 invalid.\r\n\
         Usage: ctrlram [ctrlram_index [value]]\r\n\
         > "
    );

    let out = type_bytes(&mut console, &uart, &mut serial, b"ctrlram 0\r");
    assert_eq!(out, "ctrlram 0\r\nController RAM index = 0\r\nctlram[0] is 0x70.\r\n> ");
    assert_eq!(console.editor().history().len(), 2);
}

#[test]
fn edited_line_is_what_runs() {
    let uart = ConsoleUart::new();
    let mut serial = MockSerial::new();
    let mut console = Console::new(&uart, &DEFAULT_COMMANDS);

    // "hxlp", fix the typo in place, then run.
    type_bytes(&mut console, &uart, &mut serial, b"hxlp\x1b[D\x1b[D\x08e");
    let out = type_bytes(&mut console, &uart, &mut serial, b"\x05 codeset\r");
    assert!(out.contains("Usage: codeset [set]\r\nSelect keyboard codeset\r\n"));
}
