//! Newline-delimited text reassembly.

use bytes::BytesMut;
use tracing::warn;

use super::Reassembler;

/// Longest partial line kept while waiting for its `\n`.  A peer that never
/// sends one cannot grow the buffer past this.
pub const MAX_LINE_LEN: usize = 512;

/// Splits notification chunks into lines.
///
/// A trailing `\r` is stripped, empty lines are skipped and lines that are
/// not UTF-8 are dropped with a warning.  Bytes after the last `\n` stay
/// buffered for the next chunk.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes waiting for their newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

impl Reassembler for LineBuffer {
    type Output = String;

    fn push(&mut self, chunk: &[u8], label: &str) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(newline) = self.buf.iter().position(|b| *b == b'\n') {
            let mut line = self.buf.split_to(newline + 1);
            line.truncate(newline);
            if line.ends_with(b"\r") {
                line.truncate(line.len() - 1);
            }
            if line.is_empty() {
                continue;
            }
            match String::from_utf8(line.to_vec()) {
                Ok(text) => lines.push(text),
                Err(_) => warn!(channel = %label, bytes = line.len(), "dropping non-UTF-8 line"),
            }
        }

        if self.buf.len() > MAX_LINE_LEN {
            warn!(channel = %label, bytes = self.buf.len(), "unterminated line too long; buffer cleared");
            self.buf.clear();
        }
        lines
    }

    fn reset(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emits_complete_lines_in_order() {
        // Arrange
        let mut lb = LineBuffer::new();

        // Act
        let lines = lb.push(b"STATUS:T=225;SP=200;RUN=1\nSP:205\n", "t");

        // Assert
        assert_eq!(lines, vec!["STATUS:T=225;SP=200;RUN=1", "SP:205"]);
        assert_eq!(lb.pending(), 0);
    }

    #[test]
    fn test_keeps_partial_line() {
        let mut lb = LineBuffer::new();

        assert!(lb.push(b"STATUS:T=22", "t").is_empty());
        assert_eq!(lb.pending(), 11);
        assert_eq!(lb.push(b"5;SP=200;RUN=1\nCOUNT", "t"), vec!["STATUS:T=225;SP=200;RUN=1"]);
        assert_eq!(lb.pending(), 5);
    }

    #[test]
    fn test_strips_carriage_return_and_skips_blank_lines() {
        let mut lb = LineBuffer::new();
        assert_eq!(lb.push(b"OK\r\n\n\r\nERR_X\n", "t"), vec!["OK", "ERR_X"]);
    }

    #[test]
    fn test_drops_invalid_utf8_line_only() {
        let mut lb = LineBuffer::new();
        assert_eq!(lb.push(b"\xff\xfe\n42\n", "t"), vec!["42"]);
    }

    #[test]
    fn test_overlong_partial_line_is_discarded() {
        // Arrange
        let mut lb = LineBuffer::new();
        let junk = vec![b'A'; MAX_LINE_LEN + 1];

        // Act
        let lines = lb.push(&junk, "t");
        let after = lb.push(b"OK\n", "t");

        // Assert
        assert!(lines.is_empty());
        assert_eq!(after, vec!["OK"]);
    }

    #[test]
    fn test_reset_drops_buffer() {
        let mut lb = LineBuffer::new();
        lb.push(b"12", "t");
        lb.reset();
        assert_eq!(lb.push(b"3\n", "t"), vec!["3"]);
    }
}
