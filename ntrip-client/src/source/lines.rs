//! Newline framing for the upstream byte stream.

use bytes::{Bytes, BytesMut};

/// Splits an incoming byte stream into newline-terminated chunks.
///
/// The `\n` delimiter stays at the end of each chunk. Runs longer than
/// `max_chunk` bytes without a newline are cut into `max_chunk` pieces so
/// that binary payloads keep flowing.
#[derive(Debug)]
pub struct LineSplitter {
    buf: BytesMut,
    max_chunk: usize,
}

impl LineSplitter {
    pub fn new(max_chunk: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_chunk: max_chunk.max(1),
        }
    }

    /// Append `data` and return every chunk that is now complete.
    pub fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buf.extend_from_slice(data);

        let mut chunks = Vec::new();
        loop {
            let window = self.buf.len().min(self.max_chunk);
            if let Some(pos) = self.buf[..window].iter().position(|&b| b == b'\n') {
                chunks.push(self.buf.split_to(pos + 1).freeze());
            } else if self.buf.len() >= self.max_chunk {
                chunks.push(self.buf.split_to(self.max_chunk).freeze());
            } else {
                break;
            }
        }
        chunks
    }

    /// Take whatever is left after the stream ended cleanly.
    pub fn finish(&mut self) -> Option<Bytes> {
        if self.buf.is_empty() {
            None
        } else {
            Some(self.buf.split().freeze())
        }
    }

    /// Bytes held back waiting for a delimiter.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_newline_keeping_delimiter() {
        let mut lines = LineSplitter::new(1024);
        let chunks = lines.push(b"one\ntwo\nthr");

        assert_eq!(chunks, vec![Bytes::from("one\n"), Bytes::from("two\n")]);
        assert_eq!(lines.pending(), 3);

        let chunks = lines.push(b"ee\n");
        assert_eq!(chunks, vec![Bytes::from("three\n")]);
        assert_eq!(lines.pending(), 0);
    }

    #[test]
    fn empty_lines_are_chunks() {
        let mut lines = LineSplitter::new(1024);
        let chunks = lines.push(b"\n\n");
        assert_eq!(chunks, vec![Bytes::from("\n"), Bytes::from("\n")]);
    }

    #[test]
    fn long_runs_are_capped() {
        let mut lines = LineSplitter::new(4);
        let chunks = lines.push(b"abcdefghij\n");

        assert_eq!(
            chunks,
            vec![
                Bytes::from("abcd"),
                Bytes::from("efgh"),
                Bytes::from("ij\n"),
            ]
        );
    }

    #[test]
    fn line_exactly_at_cap() {
        let mut lines = LineSplitter::new(4);
        let chunks = lines.push(b"abc\nd");
        assert_eq!(chunks, vec![Bytes::from("abc\n")]);
        assert_eq!(lines.finish(), Some(Bytes::from("d")));
    }

    #[test]
    fn finish_flushes_remainder_once() {
        let mut lines = LineSplitter::new(1024);
        lines.push(b"tail");

        assert_eq!(lines.finish(), Some(Bytes::from("tail")));
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn binary_data_passes_through() {
        let mut lines = LineSplitter::new(1024);
        let frame = [0xD3, 0x00, 0x13, 0x3E, b'\n', 0xD3];
        let chunks = lines.push(&frame);

        assert_eq!(chunks, vec![Bytes::copy_from_slice(&frame[..5])]);
        assert_eq!(lines.finish(), Some(Bytes::copy_from_slice(&frame[5..])));
    }

    #[test]
    fn zero_cap_is_treated_as_one() {
        let mut lines = LineSplitter::new(0);
        let chunks = lines.push(b"ab");
        assert_eq!(chunks, vec![Bytes::from("a"), Bytes::from("b")]);
    }
}
