//! Inbound demultiplexer: HTTP/2 DATA → frames → typed events.
//!
//! One task owns the `RecvStream` read half for the stream lifetime.
//! Arriving DATA is re-framed by the [`FrameAssembler`], then each frame
//! is routed by `:message-type`:
//!
//! - `event` — decoded (`TranscriptEvent`) or passed through as
//!   [`StreamEvent::Unrecognized`] and published on the event source;
//! - `exception` — built into a typed [`ServiceException`], pushed as an
//!   error, terminal;
//! - `error` and anything else — protocol error, terminal.
//!
//! A frame that fails its checksum or header decode is pushed as an
//! error item but does not end the session: the assembler consumed
//! exactly `total_length` bytes, so frame alignment is preserved and the
//! next frame parses independently. Corruption of a length field itself
//! (`InvalidLength`, `FrameTooLarge`) loses alignment and is terminal.
//!
//! [`FrameAssembler`]: scribe_eventstream::FrameAssembler

use std::sync::Arc;

use bytes::Bytes;
use h2::RecvStream;
use tokio::sync::{mpsc, watch};

use scribe_domain::{Result, ScribeError, ServiceException, TranscriptEvent};
use scribe_eventstream::{names, EventStreamError, Frame, FrameAssembler};

// ---------------------------------------------------------------------------
// StreamEvent
// ---------------------------------------------------------------------------

/// One item published on the event source.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    // ---
    /// A decoded transcript event.
    Transcript(TranscriptEvent),

    /// An `event` frame of a type this client does not model, passed
    /// through undecoded.
    Unrecognized {
        event_type: String,
        content_type: Option<String>,
        payload: Bytes,
    },
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes decoded frames onto the event source channel.
pub(crate) struct Dispatcher {
    // ---
    events_tx: mpsc::Sender<Result<StreamEvent>>,
}

// ---

impl Dispatcher {
    // ---
    pub(crate) fn new(events_tx: mpsc::Sender<Result<StreamEvent>>) -> Self {
        Self { events_tx }
    }

    // ---

    /// Route one frame. Returns `false` when the session must end —
    /// a terminal error, or the consumer dropped the source.
    pub(crate) async fn dispatch(&self, frame: Frame) -> bool {
        // ---
        let message_type = frame
            .string_header(names::MESSAGE_TYPE)
            .map(str::to_string);

        match message_type.as_deref() {
            Some(names::MESSAGE_TYPE_EVENT) => self.dispatch_event(frame).await,

            Some(names::MESSAGE_TYPE_EXCEPTION) => {
                let name = frame
                    .string_header(names::EXCEPTION_TYPE)
                    .unwrap_or("UnknownException");
                let exception = ServiceException::from_wire(name, &frame.payload);
                tracing::warn!(exception = %exception, "inbound: service exception");
                self.push_error(ScribeError::Service(exception)).await
            }

            Some(other) => {
                self.push_error(ScribeError::Protocol(format!(
                    "unexpected message type {other:?}"
                )))
                .await
            }

            None => {
                self.push_error(ScribeError::Protocol(
                    "frame missing :message-type".into(),
                ))
                .await
            }
        }
    }

    // ---

    async fn dispatch_event(&self, frame: Frame) -> bool {
        // ---
        let event_type = frame.string_header(names::EVENT_TYPE).map(str::to_string);

        match event_type.as_deref() {
            Some("TranscriptEvent") => match serde_json::from_slice::<TranscriptEvent>(
                &frame.payload,
            ) {
                Ok(event) => self.events_tx.send(Ok(StreamEvent::Transcript(event))).await.is_ok(),
                Err(e) => {
                    self.push_error(ScribeError::FrameDecode(format!(
                        "TranscriptEvent payload: {e}"
                    )))
                    .await
                }
            },

            Some(event_type) => {
                tracing::debug!(event_type, "inbound: unrecognized event type");
                let content_type = frame
                    .string_header(names::CONTENT_TYPE)
                    .map(str::to_string);
                let item = StreamEvent::Unrecognized {
                    event_type: event_type.to_string(),
                    content_type,
                    payload: frame.payload,
                };
                self.events_tx.send(Ok(item)).await.is_ok()
            }

            None => {
                self.push_error(ScribeError::Protocol(
                    "event frame missing :event-type".into(),
                ))
                .await
            }
        }
    }

    // ---

    /// Push an error item. Returns `false` when the session must end.
    pub(crate) async fn push_error(&self, error: ScribeError) -> bool {
        // ---
        let terminal = error.is_terminal();
        let delivered = self.events_tx.send(Err(error)).await.is_ok();
        delivered && !terminal
    }
}

// ---------------------------------------------------------------------------
// InboundDemux
// ---------------------------------------------------------------------------

/// Owns the HTTP/2 read half for one stream lifetime.
pub(crate) struct InboundDemux {
    // ---
    body: RecvStream,
    dispatcher: Dispatcher,
    cancel: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

// ---

impl InboundDemux {
    // ---
    pub(crate) fn new(
        body: RecvStream,
        dispatcher: Dispatcher,
        cancel: Arc<watch::Sender<bool>>,
    ) -> Self {
        // ---
        let cancel_rx = cancel.subscribe();
        Self {
            body,
            dispatcher,
            cancel,
            cancel_rx,
        }
    }

    // ---

    /// Read loop. Exits on stream end, terminal error, cancel, or the
    /// consumer dropping the event source. On exit the outbound side is
    /// canceled and the source closed (by dropping the sender).
    pub(crate) async fn run(mut self) {
        // ---
        let mut assembler = FrameAssembler::new();

        'read: loop {
            let data = tokio::select! {
                _ = self.cancel_rx.wait_for(|canceled| *canceled) => {
                    tracing::debug!("inbound: canceled");
                    break 'read;
                }
                maybe = self.body.data() => maybe,
            };

            match data {
                Some(Ok(bytes)) => {
                    // Returning window credit promptly keeps the service
                    // sending; errors here mean the stream is already gone.
                    let _ = self.body.flow_control().release_capacity(bytes.len());
                    assembler.push(&bytes);

                    loop {
                        match assembler.next_frame() {
                            Ok(Some(frame)) => {
                                if !self.dispatcher.dispatch(frame).await {
                                    break 'read;
                                }
                            }
                            Ok(None) => break,
                            Err(e) if !alignment_lost(&e) => {
                                if !self.dispatcher.push_error(e.into()).await {
                                    break 'read;
                                }
                            }
                            Err(e) => {
                                tracing::warn!("inbound: framing corruption: {e}");
                                self.dispatcher
                                    .push_error(ScribeError::Protocol(format!(
                                        "unrecoverable framing corruption: {e}"
                                    )))
                                    .await;
                                break 'read;
                            }
                        }
                    }
                }

                Some(Err(e)) => {
                    tracing::warn!("inbound: stream error: {e}");
                    self.dispatcher
                        .push_error(ScribeError::Transport(e.to_string()))
                        .await;
                    break 'read;
                }

                // Clean end of stream from the service.
                None => {
                    if let Err(e) = assembler.finish() {
                        self.dispatcher.push_error(e.into()).await;
                    }
                    tracing::debug!("inbound: stream ended");
                    break 'read;
                }
            }
        }

        self.cancel.send_replace(true);
    }
}

// ---

/// Length-field corruption: the byte stream can no longer be re-framed.
fn alignment_lost(e: &EventStreamError) -> bool {
    // ---
    matches!(
        e,
        EventStreamError::InvalidLength { .. } | EventStreamError::FrameTooLarge { .. }
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    // ---
    use scribe_domain::ExceptionKind;
    use scribe_eventstream::Header;

    use super::*;

    fn dispatcher() -> (Dispatcher, mpsc::Receiver<Result<StreamEvent>>) {
        let (tx, rx) = mpsc::channel(8);
        (Dispatcher::new(tx), rx)
    }

    fn event_frame(event_type: &str, payload: &'static [u8]) -> Frame {
        Frame::new(
            vec![
                Header::string(names::MESSAGE_TYPE, names::MESSAGE_TYPE_EVENT),
                Header::string(names::EVENT_TYPE, event_type),
                Header::string(names::CONTENT_TYPE, "application/json"),
            ],
            Bytes::from_static(payload),
        )
    }

    // ---

    /// A TranscriptEvent frame is decoded and published as an event.
    #[tokio::test]
    async fn transcript_event_dispatched() {
        // ---
        let (dispatcher, mut rx) = dispatcher();
        let frame = event_frame("TranscriptEvent", br#"{"Transcript":{"Results":[]}}"#);

        assert!(dispatcher.dispatch(frame).await);

        match rx.recv().await.unwrap().unwrap() {
            StreamEvent::Transcript(event) => assert_eq!(event.results().count(), 0),
            other => panic!("expected Transcript, got {other:?}"),
        }
    }

    // ---

    /// An exception frame raises a typed service exception and ends the
    /// session.
    #[tokio::test]
    async fn exception_dispatched_as_terminal_error() {
        // ---
        let (dispatcher, mut rx) = dispatcher();
        let frame = Frame::new(
            vec![
                Header::string(names::MESSAGE_TYPE, names::MESSAGE_TYPE_EXCEPTION),
                Header::string(names::EXCEPTION_TYPE, "BadRequestException"),
                Header::string(names::CONTENT_TYPE, "application/json"),
            ],
            Bytes::from_static(br#"{"Message":"bad sample rate"}"#),
        );

        assert!(!dispatcher.dispatch(frame).await);

        match rx.recv().await.unwrap().unwrap_err() {
            ScribeError::Service(exc) => {
                assert_eq!(exc.kind, ExceptionKind::BadRequest);
                assert_eq!(exc.message.as_deref(), Some("bad sample rate"));
            }
            other => panic!("expected Service, got {other:?}"),
        }
    }

    // ---

    /// `:message-type = error` (and unknown values) are terminal protocol
    /// errors.
    #[tokio::test]
    async fn error_message_type_is_terminal() {
        // ---
        let (dispatcher, mut rx) = dispatcher();
        let frame = Frame::new(
            vec![Header::string(names::MESSAGE_TYPE, names::MESSAGE_TYPE_ERROR)],
            Bytes::new(),
        );

        assert!(!dispatcher.dispatch(frame).await);
        assert!(matches!(
            rx.recv().await.unwrap().unwrap_err(),
            ScribeError::Protocol(_)
        ));
    }

    // ---

    /// An event type this client does not model passes through raw.
    #[tokio::test]
    async fn unrecognized_event_passes_through() {
        // ---
        let (dispatcher, mut rx) = dispatcher();
        let frame = event_frame("UtteranceEvent", br#"{"x":1}"#);

        assert!(dispatcher.dispatch(frame).await);

        match rx.recv().await.unwrap().unwrap() {
            StreamEvent::Unrecognized {
                event_type,
                content_type,
                payload,
            } => {
                assert_eq!(event_type, "UtteranceEvent");
                assert_eq!(content_type.as_deref(), Some("application/json"));
                assert_eq!(payload.as_ref(), br#"{"x":1}"#);
            }
            other => panic!("expected Unrecognized, got {other:?}"),
        }
    }

    // ---

    /// A malformed transcript payload is surfaced but not terminal.
    #[tokio::test]
    async fn malformed_payload_is_survivable() {
        // ---
        let (dispatcher, mut rx) = dispatcher();
        let frame = event_frame("TranscriptEvent", b"not json");

        assert!(dispatcher.dispatch(frame).await);
        assert!(matches!(
            rx.recv().await.unwrap().unwrap_err(),
            ScribeError::FrameDecode(_)
        ));
    }

    // ---

    /// A frame with no :message-type at all is a terminal protocol error.
    #[tokio::test]
    async fn missing_message_type_is_terminal() {
        // ---
        let (dispatcher, mut rx) = dispatcher();
        let frame = Frame::new(Vec::new(), Bytes::new());

        assert!(!dispatcher.dispatch(frame).await);
        assert!(matches!(
            rx.recv().await.unwrap().unwrap_err(),
            ScribeError::Protocol(_)
        ));
    }

    // ---

    /// Dropping the event source stops dispatch.
    #[tokio::test]
    async fn dropped_source_stops_dispatch() {
        // ---
        let (dispatcher, rx) = dispatcher();
        drop(rx);

        let frame = event_frame("TranscriptEvent", br#"{"Transcript":{"Results":[]}}"#);
        assert!(!dispatcher.dispatch(frame).await);
    }
}
