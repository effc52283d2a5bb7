//! Re-framing of an arbitrary inbound byte sequence into whole frames.
//!
//! HTTP/2 DATA frames carry no alignment guarantee: one DATA frame may
//! hold half an event-stream frame or three of them. The assembler
//! buffers arriving bytes and hands the frame decoder exact-length
//! buffers, preserving the codec's strict `total_length` check.
//!
//! The `total_length` field is validated against [`MAX_FRAME_LEN`] as
//! soon as it is readable, so a corrupt length cannot drive an unbounded
//! buffer.

use bytes::{Bytes, BytesMut};

use crate::error::{EventStreamError, Result};
use crate::frame::{Frame, MAX_FRAME_LEN, MIN_FRAME_LEN};

// ---------------------------------------------------------------------------
// FrameAssembler
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FrameAssembler {
    // ---
    buf: BytesMut,
}

// ---

impl FrameAssembler {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    // ---

    /// Append arriving bytes. Pair with [`next_frame`] to drain.
    ///
    /// [`next_frame`]: Self::next_frame
    pub fn push(&mut self, data: &[u8]) {
        // ---
        self.buf.extend_from_slice(data);
    }

    // ---

    /// Pop the next complete frame, `Ok(None)` if more bytes are needed.
    ///
    /// Call in a loop after each [`push`] — one push may complete several
    /// frames.
    ///
    /// [`push`]: Self::push
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        // ---
        if self.buf.len() < 4 {
            return Ok(None);
        }

        let total_len = u32::from_be_bytes(self.buf[0..4].try_into().unwrap());
        if (total_len as usize) < MIN_FRAME_LEN {
            return Err(EventStreamError::InvalidLength {
                declared: total_len,
            });
        }
        if total_len as usize > MAX_FRAME_LEN {
            return Err(EventStreamError::FrameTooLarge {
                declared: total_len,
                max: MAX_FRAME_LEN,
            });
        }

        if self.buf.len() < total_len as usize {
            return Ok(None);
        }

        let frame_bytes: Bytes = self.buf.split_to(total_len as usize).freeze();
        Frame::decode(&frame_bytes).map(Some)
    }

    // ---

    /// Check for leftover bytes at end of stream.
    ///
    /// A well-formed stream ends on a frame boundary; anything buffered
    /// here is a truncated trailing frame.
    pub fn finish(&self) -> Result<()> {
        // ---
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(EventStreamError::TruncatedFrame {
                have: self.buf.len(),
            })
        }
    }

    /// Bytes currently buffered, awaiting the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
