use thiserror::Error;

// ---------------------------------------------------------------------------
// ExceptionKind
// ---------------------------------------------------------------------------

/// Service exception vocabulary for the Transcribe streaming API.
///
/// Selected by the `:exception-type` header of an inbound `exception`
/// frame, or by the `x-amzn-errortype` response header on an HTTP error
/// (the portion before the first `:`). Values the client does not know
/// are preserved verbatim in [`ExceptionKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExceptionKind {
    // ---
    /// Malformed request — bad parameter combination, unsupported rate, …
    BadRequest,

    /// Too many concurrent streams for the account.
    LimitExceeded,

    /// The service failed internally; retry later.
    InternalFailure,

    /// A stream with the same session id is already active.
    Conflict,

    /// The service is temporarily unavailable.
    ServiceUnavailable,

    /// Unrecognized exception type, carried verbatim.
    Other(String),
}

// ---

impl ExceptionKind {
    // ---
    /// Map a wire exception name to a kind.
    ///
    /// Accepts the bare name (`BadRequestException`) and strips anything
    /// after a `:` — `x-amzn-errortype` values look like
    /// `BadRequestException:http://internal.amazon.com/...`.
    pub fn from_name(name: &str) -> Self {
        // ---
        let name = name.split(':').next().unwrap_or(name).trim();
        match name {
            "BadRequestException" => Self::BadRequest,
            "LimitExceededException" => Self::LimitExceeded,
            "InternalFailureException" => Self::InternalFailure,
            "ConflictException" => Self::Conflict,
            "ServiceUnavailableException" => Self::ServiceUnavailable,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire name of this kind.
    pub fn as_str(&self) -> &str {
        // ---
        match self {
            Self::BadRequest => "BadRequestException",
            Self::LimitExceeded => "LimitExceededException",
            Self::InternalFailure => "InternalFailureException",
            Self::Conflict => "ConflictException",
            Self::ServiceUnavailable => "ServiceUnavailableException",
            Self::Other(name) => name,
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceException
// ---------------------------------------------------------------------------

/// A typed exception decoded from the service.
///
/// The payload of an `exception` frame (and the body of an HTTP error
/// response) is a JSON document of the shape `{"Message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceException {
    // ---
    pub kind: ExceptionKind,

    /// Human-readable message from the error document, when present.
    pub message: Option<String>,
}

// ---

impl ServiceException {
    // ---
    /// Build an exception from a wire name and a raw JSON error document.
    ///
    /// A body that is not valid JSON (or lacks a message field) yields an
    /// exception with `message: None` — the kind alone is still useful.
    pub fn from_wire(name: &str, body: &[u8]) -> Self {
        // ---
        #[derive(serde::Deserialize)]
        struct ErrorDoc {
            #[serde(rename = "Message", alias = "message")]
            message: Option<String>,
        }

        let message = serde_json::from_slice::<ErrorDoc>(body)
            .ok()
            .and_then(|doc| doc.message);

        Self {
            kind: ExceptionKind::from_name(name),
            message,
        }
    }
}

impl std::fmt::Display for ServiceException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {msg}", self.kind.as_str()),
            None => write!(f, "{}", self.kind.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// ScribeError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScribeError {
    // ---
    /// An event-stream frame failed to decode (length, checksum, truncation).
    #[error("frame decode error: {0}")]
    FrameDecode(String),

    /// A typed header block failed to decode (truncation, tag, UTF-8).
    #[error("header decode error: {0}")]
    HeaderDecode(String),

    /// The peer violated the stream protocol (unexpected message type,
    /// headers after headers, data before headers).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A typed exception delivered by the service.
    #[error("service exception: {0}")]
    Service(ServiceException),

    /// Socket, TLS, or HTTP/2 failure, surfaced verbatim.
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid client-side configuration or request.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// ---

impl ScribeError {
    // ---
    /// Whether this error must tear down both directions of the stream.
    ///
    /// Decode errors are per-frame: a single malformed frame is surfaced
    /// to the consumer but the session keeps running. Everything else is
    /// terminal.
    pub fn is_terminal(&self) -> bool {
        // ---
        !matches!(self, Self::FrameDecode(_) | Self::HeaderDecode(_))
    }
}

// ---

pub type Result<T> = std::result::Result<T, ScribeError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
