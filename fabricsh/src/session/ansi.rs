//! Removal of terminal escape sequences from PTY output.

use vte::{Parser, Perform};

/// Collects printable text and the whitespace controls that shape lines.
struct Printable(Vec<u8>);

impl Perform for Printable {
    fn print(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.0.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.0.push(byte);
        }
    }
}

/// Strip ANSI escape sequences and turn CRLF into LF.
pub(crate) fn strip(data: &[u8]) -> Vec<u8> {
    let text = if memchr::memchr(0x1b, data).is_none() {
        data.to_vec()
    } else {
        let mut printable = Printable(Vec::with_capacity(data.len()));
        let mut parser = Parser::new();
        parser.advance(&mut printable, data);
        printable.0
    };
    if memchr::memchr(b'\r', &text).is_none() {
        return text;
    }
    let mut out = Vec::with_capacity(text.len());
    for (i, &b) in text.iter().enumerate() {
        if b == b'\r' && text.get(i + 1) == Some(&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(strip(b"Do you want to save? (yes, y, no, n): [no] "), b"Do you want to save? (yes, y, no, n): [no] ");
    }

    #[test]
    fn test_color_codes_removed() {
        assert_eq!(strip(b"\x1b[32mUpdating flash ...\x1b[0m\r\n"), b"Updating flash ...\n");
    }

    #[test]
    fn test_tabs_kept() {
        assert_eq!(strip(b"\x1b[1mzone:\x1b[0m\tz1\n"), b"zone:\tz1\n");
    }
}
