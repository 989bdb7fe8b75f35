//! Accumulation buffer for decoded command output.
//!
//! Output is decoded incrementally (see [`Utf8Decoder`]) and appended to a
//! single string. Prompt searches only look at the region that could have
//! changed since the last check, so large outputs (full running configs)
//! do not turn every read into a scan of everything captured so far.

use super::decoder::Utf8Decoder;

/// Buffer for accumulating output and searching its tail.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    /// Decoded output so far.
    text: String,

    /// Holds back split multi-byte sequences.
    decoder: Utf8Decoder,

    /// Length in bytes of the text appended by the last `extend`.
    last_len: usize,
}

impl OutputBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and append a chunk of raw bytes.
    pub fn extend(&mut self, data: &[u8]) {
        let decoded = self.decoder.decode(data);
        self.last_len = decoded.len();
        self.text.push_str(&decoded);
    }

    /// The region a search must cover after the last `extend`.
    ///
    /// Includes `overlap` bytes before the newly appended text so a match
    /// straddling two reads is still found.
    pub fn search_region(&self, overlap: usize) -> &str {
        let mut start = self.text.len().saturating_sub(self.last_len + overlap);
        while !self.text.is_char_boundary(start) {
            start -= 1;
        }
        &self.text[start..]
    }

    /// Decoded text so far.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Take the decoded text, flushing any incomplete trailing sequence.
    pub fn take(&mut self) -> String {
        let tail = self.decoder.finish();
        self.text.push_str(&tail);
        self.last_len = 0;
        std::mem::take(&mut self.text)
    }

    /// Get the current length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.decoder.pending_len() == 0
    }
}
