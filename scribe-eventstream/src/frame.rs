//! Event-stream frame codec.
//!
//! ## Wire layout
//!
//! ```text
//! offset
//!    0  ┐ total_length (u32, big-endian)
//!    3  ┘   includes itself and both checksums
//!    4  ┐ headers_length (u32, big-endian)
//!    7  ┘
//!    8  ┐ prelude_crc (u32, big-endian)
//!   11  ┘   CRC-32/IEEE over bytes [0, 8)
//! ------
//!    headers (headers_length bytes)
//!    payload (total_length − headers_length − 16 bytes)
//! ------
//!    message_crc (u32, big-endian) — CRC-32/IEEE over all preceding bytes
//! ```
//!
//! The minimum frame is 16 bytes (empty headers, empty payload). The
//! decoder takes an exact-length buffer: callers that read from a byte
//! stream re-frame with [`FrameAssembler`] first.
//!
//! [`FrameAssembler`]: crate::FrameAssembler

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{EventStreamError, Result};
use crate::header::{decode_headers, encode_headers, find, Header, HeaderValue};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Prelude length: total_length + headers_length + prelude_crc.
pub const PRELUDE_LEN: usize = 12;

/// Smallest legal frame: prelude + message_crc, nothing in between.
pub const MIN_FRAME_LEN: usize = 16;

/// Upper bound accepted for `total_length`.
///
/// The service sends frames in the tens of kilobytes; 16 MiB leaves
/// generous headroom while preventing a corrupt length field from
/// driving an unbounded allocation in the assembler.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One event-stream frame: an ordered header list plus an opaque payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    // ---
    pub headers: Vec<Header>,
    pub payload: Bytes,
}

// ---

impl Frame {
    // ---
    pub fn new(headers: Vec<Header>, payload: Bytes) -> Self {
        Self { headers, payload }
    }

    // ---

    /// Encode to the wire representation.
    ///
    /// Errors only if a header violates the size constraints (name > 255
    /// bytes, value > 65 535 bytes).
    pub fn encode(&self) -> Result<Bytes> {
        // ---
        let header_bytes = encode_headers(&self.headers)?;
        let total_len = MIN_FRAME_LEN + header_bytes.len() + self.payload.len();

        let mut out = Vec::with_capacity(total_len);
        out.extend_from_slice(&(total_len as u32).to_be_bytes());
        out.extend_from_slice(&(header_bytes.len() as u32).to_be_bytes());
        let prelude_crc = crc32fast::hash(&out[..8]);
        out.extend_from_slice(&prelude_crc.to_be_bytes());

        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(&self.payload);

        let message_crc = crc32fast::hash(&out);
        out.extend_from_slice(&message_crc.to_be_bytes());

        debug_assert_eq!(out.len(), total_len);
        Ok(Bytes::from(out))
    }

    // ---

    /// Decode an exact-length buffer into a frame.
    ///
    /// The buffer must hold exactly one frame: `buf.len()` must equal the
    /// encoded `total_length`. Both checksums are verified before any
    /// header parsing.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        // ---
        if buf.len() < MIN_FRAME_LEN {
            return Err(EventStreamError::BufferTooShort { have: buf.len() });
        }

        let total_len = u32::from_be_bytes(buf[0..4].try_into().unwrap());
        let headers_len = u32::from_be_bytes(buf[4..8].try_into().unwrap());

        if total_len as usize != buf.len() {
            return Err(EventStreamError::LengthMismatch {
                declared: total_len,
                actual: buf.len(),
            });
        }

        let declared_prelude_crc = u32::from_be_bytes(buf[8..12].try_into().unwrap());
        let computed = crc32fast::hash(&buf[..8]);
        if computed != declared_prelude_crc {
            return Err(EventStreamError::PreludeChecksum {
                expected: declared_prelude_crc,
                computed,
            });
        }

        let body_len = buf.len() - MIN_FRAME_LEN;
        if headers_len as usize > body_len {
            return Err(EventStreamError::HeadersOverrun {
                declared: headers_len,
                available: body_len,
            });
        }

        let crc_offset = buf.len() - 4;
        let declared_message_crc = u32::from_be_bytes(buf[crc_offset..].try_into().unwrap());
        let computed = crc32fast::hash(&buf[..crc_offset]);
        if computed != declared_message_crc {
            return Err(EventStreamError::MessageChecksum {
                expected: declared_message_crc,
                computed,
            });
        }

        let headers_end = PRELUDE_LEN + headers_len as usize;
        let headers = decode_headers(&buf[PRELUDE_LEN..headers_end])?;
        let payload = Bytes::copy_from_slice(&buf[headers_end..crc_offset]);

        Ok(Self { headers, payload })
    }

    // ---

    /// Length the encoded frame will have, barring encode errors.
    pub fn encoded_len(&self) -> Result<usize> {
        // ---
        Ok(MIN_FRAME_LEN + encode_headers(&self.headers)?.len() + self.payload.len())
    }

    // ---------------------------------------------------------------------
    // Typed header lookups
    // ---------------------------------------------------------------------

    /// First header value with `name`, untyped.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        find(&self.headers, name)
    }

    /// First `String` header with `name`; a header of another type is `None`.
    pub fn string_header(&self, name: &str) -> Option<&str> {
        self.header(name).and_then(HeaderValue::as_str)
    }

    /// First `ByteArray` header with `name`.
    pub fn byte_array_header(&self, name: &str) -> Option<&[u8]> {
        self.header(name).and_then(HeaderValue::as_bytes)
    }

    /// First `Timestamp` header with `name`.
    pub fn timestamp_header(&self, name: &str) -> Option<DateTime<Utc>> {
        self.header(name).and_then(HeaderValue::as_timestamp)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
