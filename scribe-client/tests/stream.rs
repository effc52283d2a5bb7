//! End-to-end stream tests over an in-memory duplex.
//!
//! An `h2::server` on the far end plays the service: it validates the
//! signed request, reads and unwraps the client's signed audio frames,
//! and answers with event-stream frames of its own. No network, no TLS —
//! the client enters through `start_on`.

use std::sync::Arc;

use bytes::Bytes;

use scribe_client::{ClientConfig, StreamEvent, TranscribeClient};
use scribe_domain::{
    Credentials, ExceptionKind, LanguageCode, ScribeError, StartTranscription, StaticCredentials,
};
use scribe_eventstream::{names, Frame, FrameAssembler, Header};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn test_client() -> TranscribeClient {
    let credentials = Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");
    TranscribeClient::new(
        ClientConfig::new("us-east-1"),
        Arc::new(StaticCredentials(credentials)),
    )
    .unwrap()
}

fn transcript_frame(text: &str) -> Bytes {
    let payload = format!(
        r#"{{"Transcript":{{"Results":[{{"ResultId":"r1","IsPartial":false,"StartTime":0.0,"EndTime":1.0,"Alternatives":[{{"Transcript":"{text}","Items":[]}}]}}]}}}}"#,
    );
    Frame::new(
        vec![
            Header::string(names::MESSAGE_TYPE, names::MESSAGE_TYPE_EVENT),
            Header::string(names::EVENT_TYPE, "TranscriptEvent"),
            Header::string(names::CONTENT_TYPE, "application/json"),
        ],
        Bytes::from(payload),
    )
    .encode()
    .unwrap()
}

fn exception_frame(kind: &str, message: &str) -> Bytes {
    Frame::new(
        vec![
            Header::string(names::MESSAGE_TYPE, names::MESSAGE_TYPE_EXCEPTION),
            Header::string(names::EXCEPTION_TYPE, kind),
            Header::string(names::CONTENT_TYPE, "application/json"),
        ],
        Bytes::from(format!(r#"{{"Message":"{message}"}}"#)),
    )
    .encode()
    .unwrap()
}

/// Unwrap one signed outer frame; `None` payload means the terminal marker.
fn unwrap_signed(outer: &Frame) -> Option<(Vec<u8>, Vec<u8>)> {
    let signature = outer
        .byte_array_header(names::CHUNK_SIGNATURE)
        .expect("outer frame missing :chunk-signature")
        .to_vec();
    assert_eq!(signature.len(), 32);
    assert!(outer.timestamp_header(names::DATE).is_some());

    if outer.payload.is_empty() {
        return None;
    }
    let inner = Frame::decode(&outer.payload).unwrap();
    assert_eq!(inner.string_header(names::EVENT_TYPE), Some("AudioEvent"));
    assert_eq!(inner.string_header(names::MESSAGE_TYPE), Some("event"));
    Some((signature, inner.payload.to_vec()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Full happy path: signed request → audio out (chunked, signed, chained)
/// → transcript back → clean shutdown.
#[tokio::test]
async fn full_duplex_session() {
    // ---
    let (client_io, server_io) = tokio::io::duplex(256 * 1024);

    let server = tokio::spawn(async move {
        // ---
        let mut conn = h2::server::handshake(server_io).await.unwrap();
        let (request, mut respond) = conn.accept().await.unwrap().unwrap();

        // Detached: keeps polling the connection so stream I/O makes
        // progress for the rest of the test.
        tokio::spawn(async move { while conn.accept().await.is_some() {} });

        assert_eq!(request.method(), http::Method::POST);
        assert_eq!(request.uri().path(), "/stream-transcription");
        let headers = request.headers();
        assert_eq!(
            headers.get("x-amz-target").unwrap(),
            "com.amazonaws.transcribe.Transcribe.StartStreamTranscription"
        );
        assert_eq!(
            headers.get("content-type").unwrap(),
            "application/vnd.amazon.eventstream"
        );
        assert_eq!(headers.get("x-amzn-transcribe-sample-rate").unwrap(), "16000");
        let authorization = headers.get("authorization").unwrap().to_str().unwrap();
        assert!(authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"
        ));
        assert!(headers.get("x-amz-date").is_some());

        let response = http::Response::builder()
            .status(200)
            .header("x-amzn-request-id", "req-0001")
            .body(())
            .unwrap();
        let mut send = respond.send_response(response, false).unwrap();

        // Drain the audio: expect 6400 + 6400 + 3200 bytes, then the
        // signed terminal frame, with the signature chain in frame order.
        let mut body = request.into_body();
        let mut assembler = FrameAssembler::new();
        let mut chunk_lens = Vec::new();
        let mut signatures: Vec<Vec<u8>> = Vec::new();
        let mut saw_terminal = false;

        while let Some(chunk) = body.data().await {
            let bytes = chunk.unwrap();
            let _ = body.flow_control().release_capacity(bytes.len());
            assembler.push(&bytes);
            while let Some(outer) = assembler.next_frame().unwrap() {
                match unwrap_signed(&outer) {
                    Some((signature, audio)) => {
                        assert!(!saw_terminal, "audio after the terminal frame");
                        signatures.push(signature);
                        chunk_lens.push(audio.len());
                    }
                    None => saw_terminal = true,
                }
            }
        }
        assembler.finish().unwrap();
        assert!(body.is_end_stream());
        assert!(saw_terminal);
        assert_eq!(chunk_lens, [6_400, 6_400, 3_200]);
        // Chained signatures are pairwise distinct.
        signatures.dedup();
        assert_eq!(signatures.len(), 3);

        // Answer with one transcript, then end the response.
        send.send_data(transcript_frame("hello world"), false).unwrap();
        send.send_data(Bytes::new(), true).unwrap();
    });

    // --- client side

    let client = test_client();
    let request = StartTranscription::new(LanguageCode::EnUs, 16_000);
    let (metadata, sink, mut events) = client.start_on(client_io, &request).await.unwrap();

    assert_eq!(metadata.status, 200);
    assert_eq!(metadata.request_id.as_deref(), Some("req-0001"));

    sink.send(Bytes::from(vec![0x42u8; 16_000])).await.unwrap();
    sink.close();

    match events.recv().await.unwrap().unwrap() {
        StreamEvent::Transcript(event) => {
            let results: Vec<_> = event.results().collect();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].best_transcript(), Some("hello world"));
            assert!(!results[0].is_partial);
        }
        other => panic!("expected Transcript, got {other:?}"),
    }

    // Stream ended cleanly: the source closes.
    assert!(events.recv().await.is_none());

    server.await.unwrap();
}

// ---

/// An inbound exception frame surfaces as a typed error and ends the
/// session.
#[tokio::test]
async fn exception_frame_ends_session() {
    // ---
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let server = tokio::spawn(async move {
        // ---
        let mut conn = h2::server::handshake(server_io).await.unwrap();
        let (request, mut respond) = conn.accept().await.unwrap().unwrap();
        // Detached: keeps polling the connection so stream I/O makes
        // progress for the rest of the test.
        tokio::spawn(async move { while conn.accept().await.is_some() {} });

        let response = http::Response::builder().status(200).body(()).unwrap();
        let mut send = respond.send_response(response, false).unwrap();

        send.send_data(
            exception_frame("LimitExceededException", "too many streams"),
            false,
        )
        .unwrap();
        send.send_data(Bytes::new(), true).unwrap();

        drop(request);    });

    let client = test_client();
    let request = StartTranscription::new(LanguageCode::EnUs, 16_000);
    let (_metadata, _sink, mut events) = client.start_on(client_io, &request).await.unwrap();

    match events.recv().await.unwrap().unwrap_err() {
        ScribeError::Service(exception) => {
            assert_eq!(exception.kind, ExceptionKind::LimitExceeded);
            assert_eq!(exception.message.as_deref(), Some("too many streams"));
        }
        other => panic!("expected Service, got {other:?}"),
    }
    assert!(events.recv().await.is_none());

    server.await.unwrap();
}

// ---

/// An HTTP error status fails `start_on` synchronously with the typed
/// exception from `x-amzn-errortype` and the JSON body.
#[tokio::test]
async fn error_status_fails_start() {
    // ---
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let server = tokio::spawn(async move {
        // ---
        let mut conn = h2::server::handshake(server_io).await.unwrap();
        let (request, mut respond) = conn.accept().await.unwrap().unwrap();
        // Detached: keeps polling the connection so stream I/O makes
        // progress for the rest of the test.
        tokio::spawn(async move { while conn.accept().await.is_some() {} });

        let response = http::Response::builder()
            .status(400)
            .header(
                "x-amzn-errortype",
                "BadRequestException:http://internal.amazon.com/coral/",
            )
            .header("content-length", "34")
            .body(())
            .unwrap();
        let mut send = respond.send_response(response, false).unwrap();
        send.send_data(
            Bytes::from_static(br#"{"Message":"unsupported encoding"}"#),
            true,
        )
        .unwrap();

        drop(request);    });

    let client = test_client();
    let request = StartTranscription::new(LanguageCode::EnUs, 16_000);

    match client.start_on(client_io, &request).await {
        Err(ScribeError::Service(exception)) => {
            assert_eq!(exception.kind, ExceptionKind::BadRequest);
            assert_eq!(exception.message.as_deref(), Some("unsupported encoding"));
        }
        Err(other) => panic!("expected Service error, got {other:?}"),
        Ok(_) => panic!("expected Service error, got a stream"),
    }

    server.await.unwrap();
}

// ---

/// Dropping the event source cancels the stream: the server sees the
/// request body end or reset rather than hanging.
#[tokio::test]
async fn dropping_source_cancels_stream() {
    // ---
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);

    let server = tokio::spawn(async move {
        // ---
        let mut conn = h2::server::handshake(server_io).await.unwrap();
        let (request, mut respond) = conn.accept().await.unwrap().unwrap();
        // Detached: keeps polling the connection so stream I/O makes
        // progress for the rest of the test.
        tokio::spawn(async move { while conn.accept().await.is_some() {} });

        let response = http::Response::builder().status(200).body(()).unwrap();
        let _send = respond.send_response(response, false).unwrap();

        // Read until the client's half closes or resets.
        let mut body = request.into_body();
        while let Some(chunk) = body.data().await {
            match chunk {
                Ok(bytes) => {
                    let _ = body.flow_control().release_capacity(bytes.len());
                }
                Err(_) => break, // reset from the client is expected
            }
        }
    });

    let client = test_client();
    let request = StartTranscription::new(LanguageCode::EnUs, 16_000);
    let (_metadata, sink, events) = client.start_on(client_io, &request).await.unwrap();

    drop(events);

    // The pump notices the cancel; further sends fail once it exits.
    let mut closed = false;
    for _ in 0..50 {
        if sink.send(Bytes::from_static(&[0u8; 64])).await.is_err() {
            closed = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(closed, "audio sink never closed after source drop");

    server.await.unwrap();
}
