//! Incremental UTF-8 decoding for chunked shell output.
//!
//! A multi-byte character may be split across two reads. Decoding each
//! chunk on its own would turn both halves into U+FFFD and could corrupt
//! a prompt that contains non-ASCII text, so incomplete trailing
//! sequences are held back until the next chunk arrives.

/// Stateful UTF-8 decoder.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Bytes of an incomplete trailing sequence.
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, returning all complete characters.
    ///
    /// Genuinely invalid bytes are replaced with U+FFFD. A truncated
    /// sequence at the end of the chunk is kept for the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let owned;
        let mut input: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            self.pending.extend_from_slice(chunk);
            owned = std::mem::take(&mut self.pending);
            &owned
        };

        let mut out = String::with_capacity(input.len());
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    return out;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            self.pending.extend_from_slice(rest);
                            return out;
                        }
                    }
                }
            }
        }
    }

    /// Flush any held-back bytes, replacing them with U+FFFD.
    ///
    /// Used when the stream ends with an incomplete sequence.
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }

    /// Number of bytes waiting for the rest of their sequence.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
