//! SigV4 signing of the initial HTTP request.
//!
//! A thin adapter over the shared key schedule in `scribe-eventstream`:
//! canonical request → string to sign → signature → `Authorization`
//! header. The returned hex signature seeds the per-frame chunk signer,
//! which is why this lives here rather than behind a generic signing
//! crate — the two signatures share one key schedule and one clock
//! reading.
//!
//! Only what the transcription request needs is implemented: POST, empty
//! query string, empty body hash, pre-normalized header values.

use chrono::{DateTime, Utc};

use scribe_domain::Credentials;
use scribe_eventstream::{derive_signing_key, hmac_sha256, sha256_hex, SERVICE};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// SigV4 algorithm identifier for request signing.
pub const REQUEST_ALGORITHM: &str = "AWS4-HMAC-SHA256";

// ---------------------------------------------------------------------------
// SignedRequest
// ---------------------------------------------------------------------------

/// Output of [`sign_request`]: everything the caller must attach to the
/// request, plus the raw signature that seeds the event signer.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    // ---
    /// Value for the `authorization` header.
    pub authorization: String,

    /// Value for the `x-amz-date` header (ISO-8601 basic, UTC).
    pub amz_date: String,

    /// Lowercase hex signature — the seed of the chunk-signature chain.
    pub signature: String,
}

// ---------------------------------------------------------------------------
// sign_request
// ---------------------------------------------------------------------------

/// Sign a bodyless request.
///
/// `headers` are the application headers to include in the signed set
/// (`content-type`, `x-amz-target`, the `x-amzn-transcribe-*` fields);
/// names must already be lowercase. `host`, `x-amz-date`, and — for
/// temporary credentials — `x-amz-security-token` are added here.
pub fn sign_request(
    // ---
    credentials: &Credentials,
    region: &str,
    method: &str,
    host: &str,
    path: &str,
    headers: &[(String, String)],
    now: DateTime<Utc>,
) -> SignedRequest {
    // ---
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let scope_date = now.format("%Y%m%d").to_string();
    let scope = format!("{scope_date}/{region}/{SERVICE}/aws4_request");

    // Signed header set: application headers + host + x-amz-date (+ token),
    // sorted by name as the canonical form requires.
    let mut signed: Vec<(String, String)> = headers.to_vec();
    signed.push(("host".into(), host.to_string()));
    signed.push(("x-amz-date".into(), amz_date.clone()));
    if let Some(token) = &credentials.session_token {
        signed.push(("x-amz-security-token".into(), token.clone()));
    }
    signed.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = signed
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();
    let signed_header_names = signed
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{method}\n{path}\n\n{canonical_headers}\n{signed_header_names}\n{}",
        sha256_hex(b""),
    );

    let string_to_sign = format!(
        "{REQUEST_ALGORITHM}\n{amz_date}\n{scope}\n{}",
        sha256_hex(canonical_request.as_bytes()),
    );

    let key = derive_signing_key(&credentials.secret_access_key, &scope_date, region, SERVICE);
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    let authorization = format!(
        "{REQUEST_ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_header_names}, \
         Signature={signature}",
        credentials.access_key_id,
    );

    SignedRequest {
        authorization,
        amz_date,
        signature,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use chrono::TimeZone;

    use super::*;

    const TEST_SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    fn frozen_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn request_headers() -> Vec<(String, String)> {
        [
            ("content-type", "application/vnd.amazon.eventstream"),
            (
                "x-amz-target",
                "com.amazonaws.transcribe.Transcribe.StartStreamTranscription",
            ),
            ("x-amzn-transcribe-language-code", "en-US"),
            ("x-amzn-transcribe-media-encoding", "pcm"),
            ("x-amzn-transcribe-sample-rate", "16000"),
        ]
        .iter()
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .collect()
    }

    // ---

    /// Signature vector for a fixed request at a frozen instant.
    #[test]
    fn request_signature_vector() {
        // ---
        let creds = Credentials::new("AKIDEXAMPLE", TEST_SECRET);
        let signed = sign_request(
            &creds,
            "us-east-1",
            "POST",
            "transcribestreaming.us-east-1.amazonaws.com",
            "/stream-transcription",
            &request_headers(),
            frozen_now(),
        );

        assert_eq!(signed.amz_date, "20250101T000000Z");
        assert_eq!(
            signed.signature,
            "406341765efd8b446751c1aa78b0ba7ee75efe3ab8d60afa0ef9629da23c4ebb"
        );

        let expected_names = "content-type;host;x-amz-date;x-amz-target;\
             x-amzn-transcribe-language-code;x-amzn-transcribe-media-encoding;\
             x-amzn-transcribe-sample-rate";
        assert_eq!(
            signed.authorization,
            format!(
                "AWS4-HMAC-SHA256 \
                 Credential=AKIDEXAMPLE/20250101/us-east-1/transcribe/aws4_request, \
                 SignedHeaders={expected_names}, Signature={}",
                signed.signature
            )
        );
    }

    // ---

    /// A session token joins the signed header set and changes the
    /// signature.
    #[test]
    fn session_token_is_signed() {
        // ---
        let creds = Credentials::new("AKIDEXAMPLE", TEST_SECRET).with_session_token("tok");
        let signed = sign_request(
            &creds,
            "us-east-1",
            "POST",
            "transcribestreaming.us-east-1.amazonaws.com",
            "/stream-transcription",
            &request_headers(),
            frozen_now(),
        );

        assert!(signed.authorization.contains("x-amz-security-token"));
        assert_eq!(
            signed.signature,
            "9dfd7532003e8cd6c70df058c46589620fd04db48c0876b5ab1345a6787d728d"
        );
    }
}
