//! End-to-end producer contract tests: a run request through the Axum
//! router comes back as a well-ordered SSE stream.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request};
use pretty_assertions::assert_eq;
use runwire_core::{EventType, FrameDecoder, RunEvent};
use runwire_server::{CannedAnswerAgent, RunServer, ANSWER_ID_HEADER};
use serde_json::json;
use std::time::Duration;
use tower::ServiceExt;

async fn post_run(server: &RunServer, body: serde_json::Value) -> (axum::http::HeaderMap, Vec<RunEvent>) {
    let request = Request::builder()
        .method("POST")
        .uri("/follow-up")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "text/event-stream")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = server.router().oneshot(request).await.unwrap();
    assert!(response.status().is_success());
    let headers = response.headers().clone();

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let mut decoder = FrameDecoder::new();
    decoder
        .feed_str(std::str::from_utf8(&bytes).unwrap())
        .unwrap();
    decoder.finish().unwrap();

    let mut events = Vec::new();
    while let Some(event) = decoder.next_event() {
        events.push(event);
    }
    (headers, events)
}

#[tokio::test]
async fn test_run_stream_shape_and_headers() {
    let agent = CannedAnswerAgent::new()
        .with_reply_template("Echo: {q}")
        .with_chunk_size(4)
        .with_chunk_delay(Duration::ZERO)
        .with_citations(vec![json!({"id": "c1"})]);
    let server = RunServer::new(agent);

    let (headers, events) = post_run(
        &server,
        json!({"threadId": "thread-9", "forwardedProps": {"q": "hello"}}),
    )
    .await;

    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-cache");
    assert_eq!(headers.get(header::CONNECTION).unwrap(), "keep-alive");
    assert!(headers
        .get(ANSWER_ID_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("answer_"));

    // RunStarted first, carrying the client's thread id and a fresh run id.
    match &events[0] {
        RunEvent::RunStarted {
            thread_id, run_id, ..
        } => {
            assert_eq!(thread_id, "thread-9");
            assert!(run_id.starts_with("run_"));
        }
        other => panic!("expected RunStarted first, got {:?}", other),
    }

    // Exactly one terminal event, always last.
    let terminal_positions: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_terminal())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(terminal_positions, vec![events.len() - 1]);
    assert_eq!(events.last().unwrap().event_type(), EventType::RunFinished);

    // Deltas concatenate back to the source text (round-trip law).
    let text: String = events.iter().filter_map(RunEvent::delta).collect();
    assert_eq!(text, "Echo: hello");
}

#[tokio::test]
async fn test_steps_never_overlap_on_the_wire() {
    let agent = CannedAnswerAgent::new().with_chunk_delay(Duration::ZERO);
    let server = RunServer::new(agent);

    let (_, events) = post_run(&server, json!({"forwardedProps": {"q": "hi"}})).await;

    let mut open: Option<&str> = None;
    for event in &events {
        match event {
            RunEvent::StepStarted { step_name, .. } => {
                assert!(open.is_none(), "step {:?} started inside {:?}", step_name, open);
                open = Some(step_name);
            }
            RunEvent::StepFinished { step_name, .. } => {
                assert_eq!(open, Some(step_name.as_str()));
                open = None;
            }
            _ => {}
        }
    }
    assert!(open.is_none());
}

#[tokio::test]
async fn test_message_framing_well_formed() {
    let agent = CannedAnswerAgent::new()
        .with_chunk_size(5)
        .with_chunk_delay(Duration::ZERO);
    let server = RunServer::new(agent);

    let (_, events) = post_run(&server, json!({"forwardedProps": {"q": "hi"}})).await;

    let mut open: Option<&str> = None;
    for event in &events {
        match event {
            RunEvent::TextMessageStart { message_id, .. } => {
                assert!(open.is_none());
                open = Some(message_id);
            }
            RunEvent::TextMessageContent { message_id, .. } => {
                assert_eq!(open, Some(message_id.as_str()));
            }
            RunEvent::TextMessageEnd { message_id, .. } => {
                assert_eq!(open, Some(message_id.as_str()));
                open = None;
            }
            _ => {}
        }
    }
    assert!(open.is_none());
}

#[tokio::test]
async fn test_chunked_encoding_run() {
    let agent = CannedAnswerAgent::new()
        .with_reply_template("chunk me please")
        .with_chunk_size(6)
        .with_chunk_delay(Duration::ZERO)
        .with_chunked_encoding(true);
    let server = RunServer::new(agent);

    let (_, events) = post_run(&server, json!({})).await;

    assert!(events
        .iter()
        .any(|e| e.event_type() == EventType::TextMessageChunk));
    assert!(!events
        .iter()
        .any(|e| e.event_type() == EventType::TextMessageStart));

    let text: String = events.iter().filter_map(RunEvent::delta).collect();
    assert_eq!(text, "chunk me please");
    assert_eq!(events.last().unwrap().event_type(), EventType::RunFinished);
}

#[tokio::test]
async fn test_missing_thread_id_is_assigned() {
    let agent = CannedAnswerAgent::new().with_chunk_delay(Duration::ZERO);
    let server = RunServer::new(agent);

    let (_, events) = post_run(&server, json!({"forwardedProps": {"q": "hi"}})).await;

    match &events[0] {
        RunEvent::RunStarted { thread_id, .. } => {
            assert!(thread_id.starts_with("thread_"));
        }
        other => panic!("expected RunStarted, got {:?}", other),
    }
}
