//! Outbound audio pipeline.
//!
//! Stages: chunker → audio-event framer → frame encoder → chunk signer →
//! frame encoder → HTTP/2 DATA. Ordering is strict FIFO: the signature
//! chain makes reordering or skipping detectable by the service, so one
//! pump task owns every stage and the `SendStream` write half.
//!
//! Closing the audio sink (dropping the sender) flushes the chunker,
//! sends the signed empty terminal frame, and ends the HTTP/2 stream.
//! A zero-length chunk is the end-of-stream sentinel: it is signed with
//! an empty payload rather than wrapped as an audio event.

use std::future::poll_fn;
use std::sync::Arc;

use bytes::Bytes;
use h2::SendStream;
use tokio::sync::{mpsc, watch};

use scribe_domain::{Result, ScribeError};
use scribe_eventstream::{names, EventSigner, Frame, Header};

use crate::chunker::AudioChunker;

// ---------------------------------------------------------------------------
// Framing helpers
// ---------------------------------------------------------------------------

/// Wrap an audio chunk in the inner event frame:
/// `[:content-type, :event-type, :message-type]` + chunk payload.
pub(crate) fn audio_event_frame(chunk: Bytes) -> Frame {
    // ---
    Frame::new(
        vec![
            Header::string(names::CONTENT_TYPE, "application/octet-stream"),
            Header::string(names::EVENT_TYPE, "AudioEvent"),
            Header::string(names::MESSAGE_TYPE, names::MESSAGE_TYPE_EVENT),
        ],
        chunk,
    )
}

// ---

/// Run one chunk through framer → signer → encoder, yielding the outer
/// wire bytes. A zero-length chunk produces the signed terminal frame
/// (empty outer payload).
pub(crate) fn encode_signed(signer: &mut EventSigner, chunk: Bytes) -> Result<Bytes> {
    // ---
    let payload = if chunk.is_empty() {
        Bytes::new()
    } else {
        audio_event_frame(chunk).encode()?
    };
    let signed = signer.sign(payload)?;
    Ok(signed.encode()?)
}

// ---------------------------------------------------------------------------
// OutboundPump
// ---------------------------------------------------------------------------

/// Owns the signer and the HTTP/2 write half for one stream lifetime.
pub(crate) struct OutboundPump {
    // ---
    audio_rx: mpsc::Receiver<Bytes>,
    chunker: AudioChunker,
    signer: EventSigner,
    stream: SendStream<Bytes>,
    cancel: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

// ---

impl OutboundPump {
    // ---
    pub(crate) fn new(
        audio_rx: mpsc::Receiver<Bytes>,
        chunker: AudioChunker,
        signer: EventSigner,
        stream: SendStream<Bytes>,
        cancel: Arc<watch::Sender<bool>>,
    ) -> Self {
        // ---
        let cancel_rx = cancel.subscribe();
        Self {
            audio_rx,
            chunker,
            signer,
            stream,
            cancel,
            cancel_rx,
        }
    }

    // ---

    /// Main pump loop. On error the inbound side is canceled too; normal
    /// completion leaves it running — final transcripts arrive after the
    /// last audio byte.
    pub(crate) async fn run(mut self) {
        // ---
        if let Err(e) = self.run_inner().await {
            tracing::warn!("outbound: pump failed: {e}");
            self.stream.send_reset(h2::Reason::INTERNAL_ERROR);
            self.cancel.send_replace(true);
        }
    }

    // ---

    async fn run_inner(&mut self) -> Result<()> {
        // ---
        loop {
            let msg = tokio::select! {
                _ = self.cancel_rx.wait_for(|canceled| *canceled) => {
                    tracing::debug!("outbound: canceled, resetting stream");
                    self.stream.send_reset(h2::Reason::CANCEL);
                    return Ok(());
                }
                maybe = self.audio_rx.recv() => maybe,
            };

            match msg {
                Some(audio) => {
                    for chunk in self.chunker.push(&audio) {
                        self.write_chunk(chunk).await?;
                    }
                }
                // Sink closed: flush the tail, then the terminal frame.
                None => break,
            }
        }

        for chunk in self.chunker.finish() {
            self.write_chunk(chunk).await?;
        }

        self.stream
            .send_data(Bytes::new(), true)
            .map_err(transport)?;
        tracing::debug!("outbound: audio finished, stream ended");
        Ok(())
    }

    // ---

    async fn write_chunk(&mut self, chunk: Bytes) -> Result<()> {
        // ---
        let terminal = chunk.is_empty();
        let bytes = encode_signed(&mut self.signer, chunk)?;
        tracing::trace!(len = bytes.len(), terminal, "outbound: signed frame");
        self.write_all(bytes).await
    }

    // ---

    /// Write respecting HTTP/2 flow control: reserve, await a capacity
    /// grant, send what was granted, repeat.
    async fn write_all(&mut self, mut bytes: Bytes) -> Result<()> {
        // ---
        while !bytes.is_empty() {
            self.stream.reserve_capacity(bytes.len());

            let granted = tokio::select! {
                _ = self.cancel_rx.wait_for(|canceled| *canceled) => {
                    return Err(ScribeError::Transport(
                        "canceled while awaiting send capacity".into(),
                    ));
                }
                capacity = poll_fn(|cx| self.stream.poll_capacity(cx)) => {
                    capacity
                        .ok_or_else(|| {
                            ScribeError::Transport("stream closed while awaiting capacity".into())
                        })?
                        .map_err(transport)?
                }
            };

            let piece = bytes.split_to(granted.min(bytes.len()));
            self.stream.send_data(piece, false).map_err(transport)?;
        }
        Ok(())
    }
}

// ---

fn transport(e: h2::Error) -> ScribeError {
    ScribeError::Transport(e.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
