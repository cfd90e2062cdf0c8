//! Incremental UTF-8 decoding for byte streams.
//!
//! Network chunks do not respect character boundaries, so a multi-byte
//! character may arrive split across two reads. The decoder keeps the
//! incomplete tail until the rest of it arrives.

const REPLACEMENT: char = '\u{FFFD}';

#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Decodes as much of `chunk` (plus any held-back bytes) as forms complete
    /// characters. Invalid sequences become U+FFFD.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut start = 0;

        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_len = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(
                        &self.pending[start..start + valid_len],
                    ));
                    start += valid_len;

                    match e.error_len() {
                        Some(invalid_len) => {
                            out.push(REPLACEMENT);
                            start += invalid_len;
                        }
                        // Truncated sequence at the end: wait for more bytes.
                        None => break,
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    /// Flushes the decoder at end of stream. A dangling partial sequence
    /// decodes to a single U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT.to_string()
        }
    }
}
