//! `vnd.amazon.eventstream` wire format and SigV4 chunk signing.
//!
//! The binary protocol spoken on the HTTP/2 stream of the Transcribe
//! streaming API: self-delimited frames of typed headers plus payload,
//! checksummed with CRC-32/IEEE, with every outbound frame wrapped and
//! signed by a rolling SigV4 chain.
//!
//! # Structure
//!
//! - [`header`]    — typed header codec ([`Header`], [`HeaderValue`], [`names`])
//! - [`frame`]     — frame codec ([`Frame`], prelude + CRC layout)
//! - [`assembler`] — [`FrameAssembler`], byte stream → whole frames
//! - [`signer`]    — [`EventSigner`], the per-frame signature chain
//! - [`error`]     — [`EventStreamError`], bridges into `scribe_domain`

mod assembler;
mod error;
mod frame;
mod header;
mod signer;

// --- error
pub use error::EventStreamError;

// --- header
pub use header::{decode_headers, encode_headers, find, names, Header, HeaderValue};

// --- frame
pub use frame::{Frame, MAX_FRAME_LEN, MIN_FRAME_LEN, PRELUDE_LEN};

// --- assembler
pub use assembler::FrameAssembler;

// --- signer
pub use signer::{
    // ---
    derive_signing_key,
    hmac_sha256,
    sha256_hex,
    Clock,
    EventSigner,
    EVENT_ALGORITHM,
    SERVICE,
};
