//! Byte-to-line splitting with partial-line buffering.
//!
//! Reads may end anywhere, including inside a multi-byte character, so
//! buffering happens on raw bytes and decoding only once a full line is
//! available. Lines that are not valid UTF-8 are decoded as GBK, which is
//! what the service's console emits on Chinese Windows installs.

use std::borrow::Cow;

use encoding_rs::GBK;

/// Accumulates chunks and yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            lines.push(decode_line(&self.pending[start..end]).into_owned());
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Text buffered after the last newline.
    pub fn pending(&self) -> Cow<'_, str> {
        decode_line(&self.pending)
    }

    /// Flush the unterminated remainder at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode_line(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}

/// Decode one line as UTF-8, falling back to GBK.
pub fn decode_line(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (text, _, _) = GBK.decode(bytes);
            text
        }
    }
}
