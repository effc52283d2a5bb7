//! Rolling SigV4 signer for outbound event-stream frames.
//!
//! Every outbound frame is wrapped in an outer frame carrying `:date`
//! and `:chunk-signature` headers. The signature over frame N chains to
//! frame N−1: the prior signature is the fourth line of the string to
//! sign, so the sequence is ordered and tamper-evident. The chain is
//! seeded by the signature of the initial HTTP request.
//!
//! ## String to sign
//!
//! ```text
//! AWS4-HMAC-SHA256-PAYLOAD
//! <date, ISO-8601 basic, second precision>
//! <scope: YYYYMMDD/region/transcribe/aws4_request>
//! <prior signature, 64 hex chars>
//! <hex(sha256(encoded :date header block))>
//! <hex(sha256(payload))>
//! ```
//!
//! The `:date` timestamp is truncated to whole seconds before encoding —
//! both peers must hash identical header-block bytes, and the sub-second
//! part is not representable in the ISO-8601 basic date line.
//!
//! A signer is single-producer: the chain requires a total order on
//! produced frames, so exactly one task owns the signer for the life of
//! a stream.

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use scribe_domain::Credentials;

use crate::error::Result;
use crate::frame::Frame;
use crate::header::{encode_headers, names, Header, HeaderValue};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// SigV4 algorithm identifier for event-stream payload signing.
pub const EVENT_ALGORITHM: &str = "AWS4-HMAC-SHA256-PAYLOAD";

/// Service identifier in the credential scope.
pub const SERVICE: &str = "transcribe";

// ---------------------------------------------------------------------------
// Key schedule helpers (shared with request signing)
// ---------------------------------------------------------------------------

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 of `data` under `key`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    // ---
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC-SHA256 takes any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    // ---
    hex::encode(Sha256::digest(data))
}

/// Standard SigV4 key schedule:
/// `HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), service), "aws4_request")`.
pub fn derive_signing_key(secret: &str, date: &str, region: &str, service: &str) -> [u8; 32] {
    // ---
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Injectable time source so tests can freeze the chain.
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send>;

// ---------------------------------------------------------------------------
// EventSigner
// ---------------------------------------------------------------------------

pub struct EventSigner {
    // ---
    region: String,
    secret_access_key: String,

    /// Lowercase hex signature of the previously produced frame
    /// (initially: of the HTTP request). 64 chars.
    prior_signature: String,

    /// Cached signing key, keyed by its scope date. Re-derived when the
    /// UTC day rolls over mid-stream.
    signing_key: Option<(String, [u8; 32])>,

    clock: Clock,
}

// ---

impl EventSigner {
    // ---

    /// Signer for one stream, seeded with the initial request signature.
    pub fn new(
        region: impl Into<String>,
        credentials: &Credentials,
        seed_signature: impl Into<String>,
    ) -> Self {
        // ---
        Self::with_clock(region, credentials, seed_signature, Box::new(Utc::now))
    }

    /// As [`new`], with an explicit time source.
    ///
    /// [`new`]: Self::new
    pub fn with_clock(
        region: impl Into<String>,
        credentials: &Credentials,
        seed_signature: impl Into<String>,
        clock: Clock,
    ) -> Self {
        // ---
        Self {
            region: region.into(),
            secret_access_key: credentials.secret_access_key.clone(),
            prior_signature: seed_signature.into(),
            signing_key: None,
            clock,
        }
    }

    // ---

    /// Current tail of the signature chain.
    pub fn prior_signature(&self) -> &str {
        &self.prior_signature
    }

    // ---

    /// Wrap `payload` in a signed frame and advance the chain.
    ///
    /// The returned frame carries exactly `[:date, :chunk-signature]`
    /// and `payload` untouched. The end-of-stream marker is a call with
    /// an empty payload.
    pub fn sign(&mut self, payload: Bytes) -> Result<Frame> {
        // ---
        // Whole-second truncation: the hashed header block must be
        // reproducible from the ISO-8601 basic date line alone.
        let now = (self.clock)();
        let now = Utc
            .timestamp_opt(now.timestamp(), 0)
            .single()
            .unwrap_or(now);

        let date_header = Header::new(names::DATE, HeaderValue::Timestamp(now));
        let date_block = encode_headers(std::slice::from_ref(&date_header))?;

        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let scope_date = now.format("%Y%m%d").to_string();
        let scope = format!("{scope_date}/{}/{SERVICE}/aws4_request", self.region);

        let string_to_sign = format!(
            "{EVENT_ALGORITHM}\n{amz_date}\n{scope}\n{}\n{}\n{}",
            self.prior_signature,
            sha256_hex(&date_block),
            sha256_hex(&payload),
        );

        let key = self.signing_key(&scope_date);
        let signature_bytes = hmac_sha256(&key, string_to_sign.as_bytes());
        let signature = hex::encode(signature_bytes);

        let frame = Frame::new(
            vec![
                date_header,
                Header::new(
                    names::CHUNK_SIGNATURE,
                    HeaderValue::ByteArray(Bytes::copy_from_slice(&signature_bytes)),
                ),
            ],
            payload,
        );

        self.prior_signature = signature;
        Ok(frame)
    }

    // ---

    fn signing_key(&mut self, scope_date: &str) -> [u8; 32] {
        // ---
        match &self.signing_key {
            Some((date, key)) if date == scope_date => *key,
            _ => {
                let key =
                    derive_signing_key(&self.secret_access_key, scope_date, &self.region, SERVICE);
                self.signing_key = Some((scope_date.to_string(), key));
                key
            }
        }
    }
}

impl std::fmt::Debug for EventSigner {
    // Key material stays out of logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSigner")
            .field("region", &self.region)
            .field("prior_signature", &self.prior_signature)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
