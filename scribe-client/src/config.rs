//! Client configuration.

use std::time::Duration;

use scribe_domain::{Result, ScribeError};

// ---------------------------------------------------------------------------
// Defaults — kept here so tests can import them directly.
// ---------------------------------------------------------------------------

/// Audio chunk cadence in milliseconds.
///
/// The chunker cuts audio into chunks worth this much wall-clock time at
/// the configured sample rate. The service recommends 50–200 ms chunks;
/// 200 ms keeps per-frame signing overhead low without hurting latency.
pub const CHUNK_CADENCE_MS: u64 = 200;

/// Default timeout covering TCP connect, TLS, and the HTTP/2 handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default depth of the audio sink channel (back-pressure to the producer).
pub const DEFAULT_AUDIO_BUFFER: usize = 32;

/// Default depth of the event source channel.
pub const DEFAULT_EVENT_BUFFER: usize = 32;

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ClientConfig {
    // ---
    /// AWS region, e.g. `us-east-1`. Selects both the endpoint host and
    /// the SigV4 credential scope.
    pub region: String,

    /// Endpoint authority override (`host` or `host:port`). When `None`
    /// the regional endpoint `transcribestreaming.<region>.amazonaws.com`
    /// is used.
    pub endpoint: Option<String>,

    /// Timeout for connection establishment. Once the stream is up,
    /// timeouts are the caller's concern.
    pub connect_timeout: Duration,

    /// Audio sink channel depth.
    pub audio_buffer: usize,

    /// Event source channel depth.
    pub event_buffer: usize,
}

// ---

impl ClientConfig {
    // ---
    pub fn new(region: impl Into<String>) -> Self {
        // ---
        Self {
            region: region.into(),
            endpoint: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            audio_buffer: DEFAULT_AUDIO_BUFFER,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    // ---

    /// Validate config fields the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        // ---
        if self.region.is_empty() {
            return Err(ScribeError::Configuration("region must not be empty".into()));
        }
        if self.audio_buffer == 0 || self.event_buffer == 0 {
            return Err(ScribeError::Configuration(
                "channel buffers must be > 0".into(),
            ));
        }
        Ok(())
    }

    // ---

    /// Endpoint authority: the override, or the regional default.
    pub fn authority(&self) -> String {
        // ---
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("transcribestreaming.{}.amazonaws.com", self.region),
        }
    }

    /// Host part of the authority (no port) — the TLS server name and the
    /// SigV4 `host` header value.
    pub fn host(&self) -> String {
        // ---
        let authority = self.authority();
        match authority.rsplit_once(':') {
            Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host.to_string(),
            _ => authority,
        }
    }

    /// TCP port, 443 unless the override carries one.
    pub fn port(&self) -> u16 {
        // ---
        self.authority()
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse().ok())
            .unwrap_or(443)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
