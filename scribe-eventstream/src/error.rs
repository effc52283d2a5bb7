//! Error types for `scribe-eventstream`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventStreamError {
    // ---
    #[error("frame buffer too short: {have} < 16")]
    BufferTooShort { have: usize },

    #[error("frame length mismatch: prelude declares {declared}, buffer has {actual}")]
    LengthMismatch { declared: u32, actual: usize },

    #[error("invalid frame length: {declared} < 16")]
    InvalidLength { declared: u32 },

    #[error("frame length {declared} exceeds max {max}")]
    FrameTooLarge { declared: u32, max: usize },

    #[error("headers length {declared} exceeds frame body {available}")]
    HeadersOverrun { declared: u32, available: usize },

    #[error("prelude checksum mismatch: expected {expected:08x}, computed {computed:08x}")]
    PreludeChecksum { expected: u32, computed: u32 },

    #[error("message checksum mismatch: expected {expected:08x}, computed {computed:08x}")]
    MessageChecksum { expected: u32, computed: u32 },

    #[error("stream ended mid-frame with {have} buffered bytes")]
    TruncatedFrame { have: usize },

    // ---

    #[error("header block truncated: need {need} more bytes, have {have}")]
    HeaderTruncated { need: usize, have: usize },

    #[error("unknown header value tag: {tag}")]
    UnknownTag { tag: u8 },

    #[error("header name is not valid UTF-8")]
    InvalidName,

    #[error("header string value is not valid UTF-8")]
    InvalidStringValue,

    #[error("timestamp out of range: {millis} ms")]
    InvalidTimestamp { millis: i64 },

    #[error("header name length {len} exceeds 255")]
    NameTooLong { len: usize },

    #[error("header value length {len} exceeds 65535")]
    ValueTooLong { len: usize },
}

// ---------------------------------------------------------------------------
// Bridge to scribe_domain::ScribeError
// ---------------------------------------------------------------------------

impl From<EventStreamError> for scribe_domain::ScribeError {
    // ---
    fn from(e: EventStreamError) -> Self {
        use EventStreamError::*;
        match e {
            HeaderTruncated { .. } | UnknownTag { .. } | InvalidName | InvalidStringValue
            | InvalidTimestamp { .. } | NameTooLong { .. } | ValueTooLong { .. } => {
                scribe_domain::ScribeError::HeaderDecode(e.to_string())
            }
            _ => scribe_domain::ScribeError::FrameDecode(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EventStreamError>;
