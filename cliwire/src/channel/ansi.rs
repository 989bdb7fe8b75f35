//! Terminal control sequence stripping.
//!
//! Captured output is returned verbatim; this is only used by
//! [`CommandOutput::normalized`](crate::CommandOutput::normalized) for
//! consumers that want plain text.

use vte::{Params, Parser, Perform};

/// Remove ANSI/VT escape sequences and stray control characters.
///
/// Newlines, carriage returns and tabs are kept.
pub fn strip_control_sequences(input: &str) -> String {
    let mut text = PlainText::default();
    let mut parser = Parser::new();
    parser.advance(&mut text, input.as_bytes());
    text.out
}

#[derive(Default)]
struct PlainText {
    out: String,
}

impl Perform for PlainText {
    fn print(&mut self, c: char) {
        self.out.push(c);
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.push(byte as char);
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {}

    fn csi_dispatch(
        &mut self,
        _params: &Params,
        _intermediates: &[u8],
        _ignore: bool,
        _action: char,
    ) {
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {}
}
