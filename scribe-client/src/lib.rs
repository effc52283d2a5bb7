//! Streaming transcription client over HTTP/2 event streams.
//!
//! Connects to the Transcribe streaming endpoint, pumps audio out as
//! signed event-stream frames, and yields decoded transcript events as
//! they arrive.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use scribe_client::{ClientConfig, TranscribeClient};
//! use scribe_domain::{EnvCredentials, LanguageCode, StartTranscription};
//!
//! let client = TranscribeClient::new(
//!     ClientConfig::new("us-east-1"),
//!     Arc::new(EnvCredentials),
//! )?;
//!
//! let request = StartTranscription::new(LanguageCode::EnUs, 16_000);
//! let (metadata, sink, mut events) = client.start(&request).await?;
//!
//! // One task feeds audio…
//! sink.send(pcm_bytes).await?;
//! sink.close();
//!
//! // …while another drains transcripts.
//! while let Some(item) = events.recv().await {
//!     println!("{item:?}");
//! }
//! ```
//!
//! # Structure
//!
//! - [`config`]     — [`ClientConfig`] and its defaults
//! - [`chunker`]    — [`AudioChunker`], cadence-sized repacketizing
//! - [`sigv4`]      — initial request signing ([`sign_request`])
//! - [`outbound`]   — audio pump: chunk → frame → sign → HTTP/2 DATA
//! - [`inbound`]    — demultiplexer: DATA → frames → [`StreamEvent`]
//! - [`connection`] — [`TranscribeClient`], TLS/h2 setup, the triple

mod chunker;
mod config;
mod connection;
mod inbound;
mod outbound;
mod sigv4;

// --- config
pub use config::{
    // ---
    ClientConfig,
    CHUNK_CADENCE_MS,
    DEFAULT_AUDIO_BUFFER,
    DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_EVENT_BUFFER,
};

// --- chunker
pub use chunker::AudioChunker;

// --- sigv4
pub use sigv4::{sign_request, SignedRequest, REQUEST_ALGORITHM};

// --- inbound
pub use inbound::StreamEvent;

// --- connection
pub use connection::{
    // ---
    AudioSink,
    EventSource,
    ResponseMetadata,
    TranscribeClient,
    CONTENT_TYPE_EVENTSTREAM,
    STREAM_PATH,
    X_AMZ_TARGET,
};
