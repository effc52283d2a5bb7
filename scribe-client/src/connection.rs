//! Transport driver: TLS + HTTP/2 setup, request signing, stream launch.
//!
//! [`TranscribeClient::start`] opens TCP + TLS (ALPN `h2`) to the
//! regional endpoint, signs and issues the initial request, and — once
//! the response headers arrive — hands back the working triple:
//! response metadata, the audio sink, and the event source.
//!
//! Everything that can fail at startup (TLS, ALPN, signing, an HTTP
//! error status) is surfaced synchronously from `start`. After the
//! triple is returned, failures arrive as error items on the event
//! source.
//!
//! Ownership: the outbound pump owns the HTTP/2 write half and the
//! signer; the inbound demux owns the read half. The sink and source
//! handed to the caller are channel proxies — dropping the sink ends the
//! audio (flush + signed terminal frame), dropping the source cancels
//! the stream.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use h2::RecvStream;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_rustls::TlsConnector;

use scribe_domain::{
    ProvideCredentials, Result, ScribeError, ServiceException, StartTranscription,
};
use scribe_eventstream::EventSigner;

use crate::chunker::AudioChunker;
use crate::config::ClientConfig;
use crate::inbound::{Dispatcher, InboundDemux, StreamEvent};
use crate::outbound::OutboundPump;
use crate::sigv4::sign_request;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Operation target for the initial request.
pub const X_AMZ_TARGET: &str = "com.amazonaws.transcribe.Transcribe.StartStreamTranscription";

/// Content type of both request and response bodies.
pub const CONTENT_TYPE_EVENTSTREAM: &str = "application/vnd.amazon.eventstream";

/// Request path.
pub const STREAM_PATH: &str = "/stream-transcription";

// ---------------------------------------------------------------------------
// ResponseMetadata
// ---------------------------------------------------------------------------

/// Initial response headers, surfaced before any events flow.
#[derive(Debug, Clone)]
pub struct ResponseMetadata {
    // ---
    pub status: http::StatusCode,

    /// `x-amzn-request-id`, for support correlation.
    pub request_id: Option<String>,

    /// `x-amzn-transcribe-session-id` — the service's session id (echoed
    /// or generated).
    pub session_id: Option<String>,

    /// All response headers, names lowercased.
    pub headers: Vec<(String, String)>,
}

// ---

impl ResponseMetadata {
    // ---
    fn from_parts(parts: &http::response::Parts) -> Self {
        // ---
        let headers: Vec<(String, String)> = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let get = |name: &str| {
            headers
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
        };

        Self {
            status: parts.status,
            request_id: get("x-amzn-request-id"),
            session_id: get("x-amzn-transcribe-session-id"),
            headers,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioSink
// ---------------------------------------------------------------------------

/// Producer half handed to the application. Single-producer: the frame
/// signature chain requires a total order on audio.
///
/// Dropping the sink (or calling [`close`]) flushes the chunker, sends
/// the signed end-of-stream frame, and half-closes the HTTP/2 stream.
///
/// [`close`]: Self::close
pub struct AudioSink {
    // ---
    tx: mpsc::Sender<Bytes>,
}

// ---

impl AudioSink {
    // ---
    /// Queue a slice of audio. Applies back-pressure when the pipeline
    /// is behind; errors once the stream is closed or failed.
    pub async fn send(&self, audio: Bytes) -> Result<()> {
        // ---
        self.tx
            .send(audio)
            .await
            .map_err(|_| ScribeError::Transport("audio stream is closed".into()))
    }

    /// End the audio cleanly. Equivalent to dropping the sink.
    pub fn close(self) {}
}

// ---------------------------------------------------------------------------
// EventSource
// ---------------------------------------------------------------------------

/// Consumer half handed to the application.
///
/// Yields decoded events and (possibly non-terminal) errors in wire
/// order; `None` means the stream has ended. Dropping the source before
/// natural end aborts the HTTP/2 stream.
pub struct EventSource {
    // ---
    rx: mpsc::Receiver<Result<StreamEvent>>,
    cancel: Arc<watch::Sender<bool>>,
}

// ---

impl EventSource {
    // ---
    pub async fn recv(&mut self) -> Option<Result<StreamEvent>> {
        self.rx.recv().await
    }
}

impl Drop for EventSource {
    fn drop(&mut self) {
        // No-op when the stream already finished.
        self.cancel.send_replace(true);
    }
}

// ---------------------------------------------------------------------------
// TranscribeClient
// ---------------------------------------------------------------------------

pub struct TranscribeClient {
    // ---
    config: ClientConfig,
    credentials: Arc<dyn ProvideCredentials>,
}

// ---

impl TranscribeClient {
    // ---
    pub fn new(config: ClientConfig, credentials: Arc<dyn ProvideCredentials>) -> Result<Self> {
        // ---
        config.validate()?;
        Ok(Self {
            config,
            credentials,
        })
    }

    // ---

    /// Open the connection and start a transcription stream.
    ///
    /// Returns once the initial response headers arrive. TCP, TLS, and
    /// the HTTP/2 handshake share [`ClientConfig::connect_timeout`].
    pub async fn start(
        &self,
        request: &StartTranscription,
    ) -> Result<(ResponseMetadata, AudioSink, EventSource)> {
        // ---
        let host = self.config.host();
        let port = self.config.port();

        let connect = async {
            // ---
            let tcp = TcpStream::connect((host.as_str(), port)).await?;

            let server_name = rustls::pki_types::ServerName::try_from(host.clone())
                .map_err(|_| ScribeError::Configuration(format!("invalid host name {host:?}")))?;
            let tls = tls_connector().connect(server_name, tcp).await?;

            // The service speaks eventstream over HTTP/2 only; a peer that
            // negotiated down to HTTP/1.1 cannot carry this protocol.
            let (_, session) = tls.get_ref();
            if session.alpn_protocol() != Some(b"h2".as_slice()) {
                return Err(ScribeError::Transport(
                    "peer did not negotiate ALPN h2".into(),
                ));
            }
            Ok(tls)
        };

        let io = tokio::time::timeout(self.config.connect_timeout, connect)
            .await
            .map_err(|_| {
                ScribeError::Transport(format!(
                    "timed out connecting to {host}:{port} after {:?}",
                    self.config.connect_timeout
                ))
            })??;

        tracing::debug!(%host, port, "connected, ALPN h2 negotiated");
        self.start_on(io, request).await
    }

    // ---

    /// Start a stream over an already-established connection.
    ///
    /// The I/O must already speak TLS (or be a trusted local transport —
    /// tests drive this with an in-memory duplex). Performs the HTTP/2
    /// handshake, signs and sends the initial request, and launches both
    /// pipeline tasks.
    pub async fn start_on<T>(
        &self,
        io: T,
        request: &StartTranscription,
    ) -> Result<(ResponseMetadata, AudioSink, EventSource)>
    where
        T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        // ---
        request.validate()?;
        let credentials = self.credentials.provide().await?;

        let (send_request, connection) =
            h2::client::handshake(io).await.map_err(transport)?;

        // Connection driver: owns the socket, multiplexes both halves.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!("h2 connection task ended: {e}");
            }
        });

        let mut send_request = send_request.ready().await.map_err(transport)?;

        // Application headers, then the signature over them.
        let app_headers = request_headers(request);
        let signed = sign_request(
            &credentials,
            &self.config.region,
            "POST",
            &self.config.host(),
            STREAM_PATH,
            &app_headers,
            Utc::now(),
        );

        let mut builder = http::Request::builder()
            .method(http::Method::POST)
            .uri(format!("https://{}{STREAM_PATH}", self.config.authority()));
        for (name, value) in &app_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = builder.header("x-amz-date", signed.amz_date.as_str());
        if let Some(token) = &credentials.session_token {
            builder = builder.header("x-amz-security-token", token.as_str());
        }
        builder = builder.header("authorization", signed.authorization.as_str());

        let http_request = builder
            .body(())
            .map_err(|e| ScribeError::Configuration(format!("invalid request: {e}")))?;

        let (response_fut, send_stream) = send_request
            .send_request(http_request, false)
            .map_err(transport)?;

        let response = response_fut.await.map_err(transport)?;
        let (parts, mut body) = response.into_parts();

        // An error status closes both directions; the JSON body and the
        // x-amzn-errortype header select the exception.
        if parts.status.as_u16() >= 400 {
            let error_body = read_body(&mut body).await;
            let name = parts
                .headers
                .get("x-amzn-errortype")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .unwrap_or_else(|| parts.status.as_u16().to_string());

            tracing::warn!(status = %parts.status, errortype = %name, "stream request rejected");

            let mut send_stream = send_stream;
            send_stream.send_reset(h2::Reason::CANCEL);
            return Err(ScribeError::Service(ServiceException::from_wire(
                &name,
                &error_body,
            )));
        }

        let metadata = ResponseMetadata::from_parts(&parts);
        tracing::info!(
            status = %metadata.status,
            session_id = metadata.session_id.as_deref().unwrap_or("-"),
            "transcription stream started"
        );

        // The request signature seeds the frame signature chain.
        let signer = EventSigner::new(self.config.region.clone(), &credentials, signed.signature);

        let chunker = match request.media_encoding {
            // The cadence formula assumes 16-bit PCM; container formats
            // pass through at whatever sizes the producer sends.
            scribe_domain::MediaEncoding::Pcm => {
                AudioChunker::for_sample_rate(request.media_sample_rate_hertz)
            }
            _ => AudioChunker::new(0),
        };

        let (audio_tx, audio_rx) = mpsc::channel::<Bytes>(self.config.audio_buffer);
        let (events_tx, events_rx) = mpsc::channel(self.config.event_buffer);
        let cancel = Arc::new(watch::channel(false).0);

        let pump = OutboundPump::new(audio_rx, chunker, signer, send_stream, Arc::clone(&cancel));
        tokio::spawn(pump.run());

        let demux = InboundDemux::new(body, Dispatcher::new(events_tx), Arc::clone(&cancel));
        tokio::spawn(demux.run());

        Ok((
            metadata,
            AudioSink { tx: audio_tx },
            EventSource {
                rx: events_rx,
                cancel,
            },
        ))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Application headers for the initial request: fixed operation headers
/// plus the request DTO mapping. All names lowercase (they join the
/// SigV4 signed header set).
fn request_headers(request: &StartTranscription) -> Vec<(String, String)> {
    // ---
    let mut headers: Vec<(String, String)> = vec![
        ("content-type".into(), CONTENT_TYPE_EVENTSTREAM.into()),
        ("x-amz-target".into(), X_AMZ_TARGET.into()),
    ];
    headers.extend(
        request
            .to_headers()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value)),
    );
    headers
}

// ---

/// rustls client config: public web roots, ALPN pinned to h2.
fn tls_connector() -> TlsConnector {
    // ---
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let mut config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"h2".to_vec()];

    TlsConnector::from(Arc::new(config))
}

// ---

/// Drain a response body (used for HTTP error documents only).
async fn read_body(body: &mut RecvStream) -> Vec<u8> {
    // ---
    let mut out = Vec::new();
    while let Some(chunk) = body.data().await {
        match chunk {
            Ok(bytes) => {
                let _ = body.flow_control().release_capacity(bytes.len());
                out.extend_from_slice(&bytes);
            }
            Err(_) => break,
        }
    }
    out
}

// ---

fn transport(e: h2::Error) -> ScribeError {
    ScribeError::Transport(e.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
