//! Repacketizing of application audio into fixed-size chunks.
//!
//! The producer hands the sink arbitrarily sized slices; the service
//! wants steady chunks sized to a fixed wall-clock cadence. The chunker
//! buffers up to `chunk_size` bytes and emits full chunks as they fill.
//!
//! On close it flushes the partial tail and then — only if the stream
//! ever carried audio — emits one zero-length chunk. Downstream the
//! empty chunk becomes the signed end-of-stream frame, so emitting it
//! for a silent stream would tell the service audio ended before any
//! was sent.

use bytes::Bytes;

use crate::config::CHUNK_CADENCE_MS;

// ---------------------------------------------------------------------------
// AudioChunker
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AudioChunker {
    // ---
    chunk_size: usize,
    buf: Vec<u8>,
    seen_bytes: bool,
}

// ---

impl AudioChunker {
    // ---

    /// Chunker with an explicit chunk size in bytes.
    ///
    /// `chunk_size == 0` disables repacketizing: every input slice passes
    /// through as one chunk.
    pub fn new(chunk_size: usize) -> Self {
        // ---
        Self {
            chunk_size,
            buf: Vec::with_capacity(chunk_size),
            seen_bytes: false,
        }
    }

    /// Chunker sized for 16-bit mono PCM at `sample_rate` Hz and the
    /// standard cadence: `sample_rate * 2 * 200 / 1000` bytes.
    pub fn for_sample_rate(sample_rate: u32) -> Self {
        // ---
        Self::new(sample_rate as usize * 2 * CHUNK_CADENCE_MS as usize / 1000)
    }

    /// The configured chunk size in bytes (0 = pass-through).
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    // ---

    /// Feed a slice of audio; returns the full chunks it completed.
    pub fn push(&mut self, mut data: &[u8]) -> Vec<Bytes> {
        // ---
        if !data.is_empty() {
            self.seen_bytes = true;
        }

        if self.chunk_size == 0 {
            return if data.is_empty() {
                Vec::new()
            } else {
                vec![Bytes::copy_from_slice(data)]
            };
        }

        let mut out = Vec::new();
        while !data.is_empty() {
            let room = self.chunk_size - self.buf.len();
            let n = room.min(data.len());
            self.buf.extend_from_slice(&data[..n]);
            data = &data[n..];

            if self.buf.len() == self.chunk_size {
                let full = std::mem::replace(&mut self.buf, Vec::with_capacity(self.chunk_size));
                out.push(Bytes::from(full));
            }
        }
        out
    }

    // ---

    /// Close the chunker: the partial tail (when any), then the
    /// zero-length end-of-stream sentinel (when any audio was ever seen).
    pub fn finish(&mut self) -> Vec<Bytes> {
        // ---
        let mut out = Vec::new();
        if !self.buf.is_empty() {
            out.push(Bytes::from(std::mem::take(&mut self.buf)));
        }
        if self.seen_bytes {
            self.seen_bytes = false;
            out.push(Bytes::new());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
