//! Full loopback: the real client against the real producer over a
//! socket, no mocks.

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use runwire::client::{HttpAgent, RunSubscriber, StateSubscriber};
use runwire::server::{CannedAnswerAgent, RunServer};
use runwire::{RunAgentInput, RunEvent};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<RunEvent>>>,
}

impl RunSubscriber for Recorder {
    fn on_event(&mut self, event: &RunEvent) {
        self.events.lock().push(event.clone());
    }
}

async fn spawn_server(agent: CannedAnswerAgent) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = RunServer::new(agent).router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/follow-up", addr)
}

#[tokio::test]
async fn test_loopback_follow_up_answer() {
    let url = spawn_server(
        CannedAnswerAgent::new()
            .with_reply_template("Answer about {q}.")
            .with_chunk_size(5)
            .with_chunk_delay(Duration::from_millis(2))
            .with_citations(vec![json!({"id": "c1", "title": "Docs"})]),
    )
    .await;

    let agent = HttpAgent::new(url)
        .with_agent_id("unique-agent-id")
        .with_thread_id("conversation id")
        .with_bearer_token("123");
    let recorder = Recorder::default();
    let state = StateSubscriber::new();
    let _r = agent.subscribe(recorder.clone());
    let _s = agent.subscribe(state.clone());

    agent
        .run(RunAgentInput::new().with_forwarded_prop("q", json!("pipelines")))
        .await
        .unwrap();

    let start = tokio::time::Instant::now();
    while !state.snapshot().is_settled() {
        assert!(start.elapsed() < Duration::from_secs(5), "run never settled");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let snapshot = state.snapshot();
    assert!(snapshot.finished);
    assert!(snapshot.error.is_none());
    assert!(snapshot.is_answer_generated);
    assert_eq!(snapshot.thread_id.as_deref(), Some("conversation id"));
    assert_eq!(snapshot.citations.len(), 1);
    assert_eq!(snapshot.citations[0].id, "c1");

    let full_text: String = snapshot
        .messages
        .values()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(full_text, "Answer about pipelines.");
    assert!(snapshot.messages.values().all(|m| m.complete));

    // Out-of-band answer id came through the response header.
    assert!(agent.last_answer_id().unwrap().starts_with("answer_"));

    // Terminal is last and unique on the dispatched feed too.
    let events = recorder.events.lock().clone();
    assert!(events.last().unwrap().is_terminal());
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_loopback_chunked_producer() {
    let url = spawn_server(
        CannedAnswerAgent::new()
            .with_reply_template("chunked {q}")
            .with_chunk_size(4)
            .with_chunk_delay(Duration::ZERO)
            .with_chunked_encoding(true),
    )
    .await;

    let agent = HttpAgent::new(url);
    let state = StateSubscriber::new();
    let _s = agent.subscribe(state.clone());

    agent
        .run(RunAgentInput::new().with_forwarded_prop("q", json!("reply")))
        .await
        .unwrap();

    let start = tokio::time::Instant::now();
    while !state.snapshot().is_settled() {
        assert!(start.elapsed() < Duration::from_secs(5), "run never settled");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let snapshot = state.snapshot();
    let full_text: String = snapshot
        .messages
        .values()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(full_text, "chunked reply");
    assert!(snapshot.messages.values().all(|m| m.complete));
}
