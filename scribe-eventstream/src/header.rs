//! Typed header codec for event-stream frames.
//!
//! ## Wire layout (per header)
//!
//! ```text
//! offset
//!    0  name_len (u8)
//!    1  name (name_len bytes, UTF-8)
//!    .  type tag (u8, 0..=9)
//!    .  value bytes (tag-dependent, see [`HeaderValue`])
//! ```
//!
//! All multi-byte integers are big-endian. Variable-length values
//! (string, byte array) carry a u16 big-endian length prefix; names are
//! capped at 255 bytes, values at 65 535.
//!
//! Duplicate names are legal at this layer and preserved in order;
//! [`find`] returns the first match.

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::error::{EventStreamError, Result};

// ---------------------------------------------------------------------------
// Well-known header names
// ---------------------------------------------------------------------------

/// Header names and `:message-type` values defined by the protocol.
pub mod names {
    // ---
    pub const MESSAGE_TYPE: &str = ":message-type";
    pub const EVENT_TYPE: &str = ":event-type";
    pub const EXCEPTION_TYPE: &str = ":exception-type";
    pub const CONTENT_TYPE: &str = ":content-type";
    pub const DATE: &str = ":date";
    pub const CHUNK_SIGNATURE: &str = ":chunk-signature";

    // --- `:message-type` values
    pub const MESSAGE_TYPE_EVENT: &str = "event";
    pub const MESSAGE_TYPE_EXCEPTION: &str = "exception";
    pub const MESSAGE_TYPE_ERROR: &str = "error";
}

// ---------------------------------------------------------------------------
// HeaderValue
// ---------------------------------------------------------------------------

/// A typed header value. The wire tag of each variant is its ordinal —
/// [`HeaderValue::tag`] and the decode table below must stay in sync,
/// which `tag_bytes_match_ordinals` pins down.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    // ---
    /// Tag 0. No value bytes.
    BoolTrue,
    /// Tag 1. No value bytes.
    BoolFalse,
    /// Tag 2. Signed 8-bit.
    Byte(i8),
    /// Tag 3. Signed 16-bit big-endian.
    Short(i16),
    /// Tag 4. Signed 32-bit big-endian.
    Integer(i32),
    /// Tag 5. Signed 64-bit big-endian.
    Long(i64),
    /// Tag 6. u16 big-endian length prefix + raw bytes.
    ByteArray(Bytes),
    /// Tag 7. u16 big-endian length prefix + UTF-8 bytes.
    String(String),
    /// Tag 8. Milliseconds since the Unix epoch, signed 64-bit big-endian.
    Timestamp(DateTime<Utc>),
    /// Tag 9. 16 raw bytes.
    Uuid(Uuid),
}

// ---

impl HeaderValue {
    // ---
    /// Wire tag byte for this variant.
    pub fn tag(&self) -> u8 {
        // ---
        match self {
            Self::BoolTrue => 0,
            Self::BoolFalse => 1,
            Self::Byte(_) => 2,
            Self::Short(_) => 3,
            Self::Integer(_) => 4,
            Self::Long(_) => 5,
            Self::ByteArray(_) => 6,
            Self::String(_) => 7,
            Self::Timestamp(_) => 8,
            Self::Uuid(_) => 9,
        }
    }

    /// Borrow the string value, if this is a `String` header.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the raw bytes, if this is a `ByteArray` header.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::ByteArray(b) => Some(b),
            _ => None,
        }
    }

    /// The timestamp, if this is a `Timestamp` header.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// A named, typed header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    // ---
    pub name: String,
    pub value: HeaderValue,
}

// ---

impl Header {
    // ---
    pub fn new(name: impl Into<String>, value: HeaderValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Shorthand for a `String` header.
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, HeaderValue::String(value.into()))
    }
}

// ---

/// First header with `name`, or `None`. Duplicates are permitted on the
/// wire; lookup is defined as first-match.
pub fn find<'a>(headers: &'a [Header], name: &str) -> Option<&'a HeaderValue> {
    // ---
    headers.iter().find(|h| h.name == name).map(|h| &h.value)
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode a header list into a contiguous block.
pub fn encode_headers(headers: &[Header]) -> Result<Vec<u8>> {
    // ---
    let mut out = Vec::new();
    for header in headers {
        encode_header(header, &mut out)?;
    }
    Ok(out)
}

// ---

fn encode_header(header: &Header, out: &mut Vec<u8>) -> Result<()> {
    // ---
    let name = header.name.as_bytes();
    if name.len() > u8::MAX as usize {
        return Err(EventStreamError::NameTooLong { len: name.len() });
    }
    out.push(name.len() as u8);
    out.extend_from_slice(name);
    out.push(header.value.tag());

    match &header.value {
        HeaderValue::BoolTrue | HeaderValue::BoolFalse => {}
        HeaderValue::Byte(v) => out.push(*v as u8),
        HeaderValue::Short(v) => out.extend_from_slice(&v.to_be_bytes()),
        HeaderValue::Integer(v) => out.extend_from_slice(&v.to_be_bytes()),
        HeaderValue::Long(v) => out.extend_from_slice(&v.to_be_bytes()),
        HeaderValue::ByteArray(bytes) => put_prefixed(out, bytes)?,
        HeaderValue::String(s) => put_prefixed(out, s.as_bytes())?,
        HeaderValue::Timestamp(t) => {
            out.extend_from_slice(&t.timestamp_millis().to_be_bytes())
        }
        HeaderValue::Uuid(u) => out.extend_from_slice(u.as_bytes()),
    }
    Ok(())
}

// ---

fn put_prefixed(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    // ---
    let len = u16::try_from(bytes.len())
        .map_err(|_| EventStreamError::ValueTooLong { len: bytes.len() })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decode a header block, walking the buffer until exhausted.
pub fn decode_headers(buf: &[u8]) -> Result<Vec<Header>> {
    // ---
    let mut pos = 0usize;
    let mut out = Vec::new();

    while pos < buf.len() {
        // ---
        let name_len = take(buf, &mut pos, 1)?[0] as usize;
        let name = std::str::from_utf8(take(buf, &mut pos, name_len)?)
            .map_err(|_| EventStreamError::InvalidName)?
            .to_string();

        let tag = take(buf, &mut pos, 1)?[0];
        let value = match tag {
            0 => HeaderValue::BoolTrue,
            1 => HeaderValue::BoolFalse,
            2 => HeaderValue::Byte(take(buf, &mut pos, 1)?[0] as i8),
            3 => HeaderValue::Short(i16::from_be_bytes(
                take(buf, &mut pos, 2)?.try_into().unwrap(),
            )),
            4 => HeaderValue::Integer(i32::from_be_bytes(
                take(buf, &mut pos, 4)?.try_into().unwrap(),
            )),
            5 => HeaderValue::Long(i64::from_be_bytes(
                take(buf, &mut pos, 8)?.try_into().unwrap(),
            )),
            6 => {
                let len = u16::from_be_bytes(take(buf, &mut pos, 2)?.try_into().unwrap());
                HeaderValue::ByteArray(Bytes::copy_from_slice(take(buf, &mut pos, len as usize)?))
            }
            7 => {
                let len = u16::from_be_bytes(take(buf, &mut pos, 2)?.try_into().unwrap());
                let s = std::str::from_utf8(take(buf, &mut pos, len as usize)?)
                    .map_err(|_| EventStreamError::InvalidStringValue)?;
                HeaderValue::String(s.to_string())
            }
            8 => {
                let millis =
                    i64::from_be_bytes(take(buf, &mut pos, 8)?.try_into().unwrap());
                let t = Utc
                    .timestamp_millis_opt(millis)
                    .single()
                    .ok_or(EventStreamError::InvalidTimestamp { millis })?;
                HeaderValue::Timestamp(t)
            }
            9 => {
                let raw: [u8; 16] = take(buf, &mut pos, 16)?.try_into().unwrap();
                HeaderValue::Uuid(Uuid::from_bytes(raw))
            }
            tag => return Err(EventStreamError::UnknownTag { tag }),
        };

        out.push(Header { name, value });
    }

    Ok(out)
}

// ---

/// Consume `n` bytes at `pos`, or error with how many are missing.
fn take<'a>(buf: &'a [u8], pos: &mut usize, n: usize) -> Result<&'a [u8]> {
    // ---
    let have = buf.len() - *pos;
    if have < n {
        return Err(EventStreamError::HeaderTruncated {
            need: n - have,
            have,
        });
    }
    let slice = &buf[*pos..*pos + n];
    *pos += n;
    Ok(slice)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
