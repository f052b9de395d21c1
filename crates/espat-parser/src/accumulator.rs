//! Line accumulation in front of the dispatch engine.
//!
//! Collects raw serial bytes until a terminator (`\r`, `\n` or `;`) is seen,
//! then hands out one trimmed line at a time. Enforces the shared
//! [`AT_MAX_LINE_LENGTH`] ceiling: an over-long line is reported once as
//! [`AtError::Overflow`], the offending input is discarded through its
//! terminator, and the next valid line parses normally.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::AtError;
use crate::parse::AT_MAX_LINE_LENGTH;

fn is_terminator(byte: u8) -> bool {
    matches!(byte, b'\r' | b'\n' | b';')
}

/// Accumulates serial input into complete, terminator-stripped lines.
///
/// The length ceiling applies per line, counted since the last terminator;
/// terminators themselves and earlier completed lines awaiting drain do not
/// count against it.
#[derive(Debug, Default)]
pub struct LineAccumulator {
    buffer: BytesMut,
    /// Bytes of the current (unterminated) line at the buffer's tail.
    line_len: usize,
    /// Discarding the tail of an over-long line until its terminator.
    discarding: bool,
    /// An overflow happened and has not been reported yet.
    overflow_pending: bool,
}

impl LineAccumulator {
    /// Create a new accumulator.
    pub fn new() -> Self {
        LineAccumulator {
            buffer: BytesMut::with_capacity(AT_MAX_LINE_LENGTH),
            line_len: 0,
            discarding: false,
            overflow_pending: false,
        }
    }

    /// Add received bytes.
    pub fn push(&mut self, data: &[u8]) {
        for &byte in data {
            if self.discarding {
                if is_terminator(byte) {
                    self.discarding = false;
                }
                continue;
            }

            if is_terminator(byte) {
                self.buffer.extend_from_slice(&[byte]);
                self.line_len = 0;
                continue;
            }

            if self.line_len == AT_MAX_LINE_LENGTH {
                log::warn!("input line exceeded {} bytes, resetting", AT_MAX_LINE_LENGTH);
                // Drop only the over-long line; completed lines ahead of it
                // stay intact.
                let keep = self.buffer.len() - self.line_len;
                self.buffer.truncate(keep);
                self.line_len = 0;
                self.discarding = true;
                self.overflow_pending = true;
                continue;
            }

            self.buffer.extend_from_slice(&[byte]);
            self.line_len += 1;
        }
    }

    /// Take the next complete line, if any.
    ///
    /// Returns `Some(Err(Overflow))` exactly once after an over-long line was
    /// seen, after the completed lines in front of it have been drained.
    /// Empty lines (and bare terminators) are skipped.
    pub fn next_line(&mut self) -> Option<Result<String, AtError>> {
        while let Some(end) = self.buffer.iter().position(|&b| is_terminator(b)) {
            let line = self.buffer.split_to(end);
            self.buffer.advance(1); // the terminator itself

            let line = String::from_utf8_lossy(&line).trim().to_string();
            if line.is_empty() {
                continue;
            }
            return Some(Ok(line));
        }

        if self.overflow_pending {
            self.overflow_pending = false;
            return Some(Err(AtError::Overflow));
        }
        None
    }

    /// Take up to `max` buffered bytes raw, bypassing line framing.
    ///
    /// Used by the send-mode relay while normal parsing is suspended.
    pub fn take_raw(&mut self, max: usize) -> Bytes {
        let n = max.min(self.buffer.len());
        let taken = self.buffer.split_to(n).freeze();
        self.line_len = self
            .buffer
            .iter()
            .rev()
            .take_while(|&&b| !is_terminator(b))
            .count();
        taken
    }

    /// Number of buffered bytes awaiting a terminator.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Discard all buffered input and reset overflow tracking.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.line_len = 0;
        self.discarding = false;
        self.overflow_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let mut acc = LineAccumulator::new();
        acc.push(b"AT+CWMODE?\r");
        assert_eq!(acc.next_line(), Some(Ok("AT+CWMODE?".to_string())));
        assert_eq!(acc.next_line(), None);
    }

    #[test]
    fn test_semicolon_terminator() {
        let mut acc = LineAccumulator::new();
        acc.push(b"AT+GMR;AT+RST\r");
        assert_eq!(acc.next_line(), Some(Ok("AT+GMR".to_string())));
        assert_eq!(acc.next_line(), Some(Ok("AT+RST".to_string())));
    }

    #[test]
    fn test_partial_line() {
        let mut acc = LineAccumulator::new();
        acc.push(b"AT+CW");
        assert_eq!(acc.next_line(), None);
        acc.push(b"MODE=1\r");
        assert_eq!(acc.next_line(), Some(Ok("AT+CWMODE=1".to_string())));
    }

    #[test]
    fn test_crlf_and_blank_lines_skipped() {
        let mut acc = LineAccumulator::new();
        acc.push(b"\r\nAT\r\n\r\n");
        assert_eq!(acc.next_line(), Some(Ok("AT".to_string())));
        assert_eq!(acc.next_line(), None);
    }

    #[test]
    fn test_whitespace_trimmed() {
        let mut acc = LineAccumulator::new();
        acc.push(b"  AT+RST  \r");
        assert_eq!(acc.next_line(), Some(Ok("AT+RST".to_string())));
    }

    #[test]
    fn test_overflow_reported_once_then_recovers() {
        let mut acc = LineAccumulator::new();

        // 600 bytes with no terminator against a 512-byte maximum.
        acc.push(&[b'A'; 600]);
        assert_eq!(acc.next_line(), Some(Err(AtError::Overflow)));
        assert_eq!(acc.next_line(), None);

        // The tail of the bad line is discarded through its terminator and a
        // subsequent valid line parses normally.
        acc.push(b"AAAA\rAT+GMR\r");
        assert_eq!(acc.next_line(), Some(Ok("AT+GMR".to_string())));
    }

    #[test]
    fn test_line_at_exact_limit_accepted() {
        let mut acc = LineAccumulator::new();
        acc.push(&[b'A'; AT_MAX_LINE_LENGTH]);
        acc.push(b"\r");
        let line = acc.next_line().unwrap().unwrap();
        assert_eq!(line.len(), AT_MAX_LINE_LENGTH);
    }

    #[test]
    fn test_line_one_past_limit_rejected() {
        let mut acc = LineAccumulator::new();
        acc.push(&[b'A'; AT_MAX_LINE_LENGTH + 1]);
        acc.push(b"\r");
        assert_eq!(acc.next_line(), Some(Err(AtError::Overflow)));
        assert_eq!(acc.next_line(), None);
    }

    #[test]
    fn test_pending_line_survives_long_partial() {
        let mut acc = LineAccumulator::new();

        // A complete line followed by a large sub-limit partial in the same
        // chunk: the ceiling is per line, not per buffer.
        acc.push(b"AT+GMR\r");
        acc.push(&[b'A'; 510]);
        assert_eq!(acc.next_line(), Some(Ok("AT+GMR".to_string())));
        assert_eq!(acc.next_line(), None);

        // Finishing the partial under the limit parses it normally.
        acc.push(b"\r");
        let line = acc.next_line().unwrap().unwrap();
        assert_eq!(line.len(), 510);
    }

    #[test]
    fn test_pending_line_survives_overflowing_second_line() {
        let mut acc = LineAccumulator::new();
        acc.push(b"AT+GMR\r");
        acc.push(&[b'A'; 600]);

        // The completed line drains first; the overflow is reported after.
        assert_eq!(acc.next_line(), Some(Ok("AT+GMR".to_string())));
        assert_eq!(acc.next_line(), Some(Err(AtError::Overflow)));
        assert_eq!(acc.next_line(), None);
    }

    #[test]
    fn test_take_raw_bypasses_framing() {
        let mut acc = LineAccumulator::new();
        acc.push(b"hello\rworld");
        let raw = acc.take_raw(5);
        assert_eq!(&raw[..], b"hello");
        assert_eq!(acc.buffered_len(), 6);

        let rest = acc.take_raw(100);
        assert_eq!(&rest[..], b"\rworld");
        assert_eq!(acc.buffered_len(), 0);
    }
}
