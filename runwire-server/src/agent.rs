//! Agent trait and the canned demo agent.

use crate::emitter::RunEmitter;
use crate::error::EmitResult;
use async_trait::async_trait;
use runwire_core::{generate_message_id, RunAgentInput};
use serde_json::{json, Value};
use std::time::Duration;

/// Business logic for one run.
///
/// The emitter is the agent's only channel to the client; what the agent
/// actually computes (search, generation, citation lookup) is outside the
/// protocol. Implementations do not emit RunStarted or the terminal event
/// themselves: the endpoint wrapper brackets every run and guarantees a
/// terminal event on all paths, including agent failure.
#[async_trait]
pub trait RunAgent: Send + Sync {
    /// Execute one run, streaming progress and content through `emitter`.
    async fn run(&self, input: &RunAgentInput, emitter: &mut RunEmitter) -> EmitResult<()>;
}

const DEFAULT_REPLY_TEMPLATE: &str = "You asked about \"{q}\", which is an interesting topic! \
A query pipeline is a set of rules or model associations that modify queries performed in \
search interfaces, allowing different search experiences to be tailored to distinct user \
groups or purposes.";

/// Demo agent that streams a templated reply in fixed-size chunks.
///
/// Emits a `retrieve` step pair, a `citations` custom event when
/// citations are configured, then the reply text in `chunk_size`-char
/// deltas with an artificial delay between them, and finishes with
/// `{"generated": true}`. With [`CannedAnswerAgent::with_chunked_encoding`]
/// it uses standalone chunk events instead of start/content/end framing.
#[derive(Debug, Clone)]
pub struct CannedAnswerAgent {
    reply_template: String,
    chunk_size: usize,
    chunk_delay: Duration,
    citations: Vec<Value>,
    chunked_encoding: bool,
}

impl Default for CannedAnswerAgent {
    fn default() -> Self {
        Self {
            reply_template: DEFAULT_REPLY_TEMPLATE.to_string(),
            chunk_size: 12,
            chunk_delay: Duration::from_millis(60),
            citations: Vec::new(),
            chunked_encoding: false,
        }
    }
}

impl CannedAnswerAgent {
    /// Create a canned agent with the default reply.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reply template. `{q}` is replaced with the question from
    /// `forwardedProps.q`.
    pub fn with_reply_template(mut self, template: impl Into<String>) -> Self {
        self.reply_template = template.into();
        self
    }

    /// Set the streaming chunk size in characters (minimum 1).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the artificial delay between chunks.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Set the citation payloads emitted as a `citations` custom event.
    pub fn with_citations(mut self, citations: Vec<Value>) -> Self {
        self.citations = citations;
        self
    }

    /// Use the standalone chunk encoding instead of start/content/end
    /// framing.
    pub fn with_chunked_encoding(mut self, chunked: bool) -> Self {
        self.chunked_encoding = chunked;
        self
    }
}

#[async_trait]
impl RunAgent for CannedAnswerAgent {
    async fn run(&self, input: &RunAgentInput, emitter: &mut RunEmitter) -> EmitResult<()> {
        let question = input.forwarded_str("q").unwrap_or("your question");
        let reply = self.reply_template.replace("{q}", question);

        emitter.step_started("retrieve").await?;
        if !self.citations.is_empty() {
            emitter
                .custom("citations", json!({ "citations": self.citations }))
                .await?;
        }
        emitter.step_finished("retrieve").await?;

        let message_id = generate_message_id();
        let chunks = chunk_text(&reply, self.chunk_size);

        if self.chunked_encoding {
            for chunk in chunks {
                tokio::time::sleep(self.chunk_delay).await;
                emitter.message_chunk(&message_id, chunk).await?;
            }
        } else {
            emitter.message_start(&message_id).await?;
            for chunk in chunks {
                tokio::time::sleep(self.chunk_delay).await;
                emitter.message_content(&message_id, chunk).await?;
            }
            emitter.message_end(&message_id).await?;
        }

        emitter.finish(Some(json!({ "generated": true }))).await
    }
}

/// Split text into chunks of at most `size` characters, respecting UTF-8
/// boundaries.
fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == size {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::RunEmitter;
    use runwire_core::{EventType, RunContext, RunEvent};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_chunk_text() {
        assert_eq!(chunk_text("abcdef", 2), vec!["ab", "cd", "ef"]);
        assert_eq!(chunk_text("abcde", 2), vec!["ab", "cd", "e"]);
        assert_eq!(chunk_text("", 2), Vec::<String>::new());
    }

    #[test]
    fn test_chunk_text_utf8() {
        let chunks = chunk_text("héllo wörld", 3);
        assert_eq!(chunks.concat(), "héllo wörld");
    }

    async fn collect_run(agent: CannedAnswerAgent, input: RunAgentInput) -> Vec<RunEvent> {
        let (tx, mut rx) = mpsc::channel(256);
        let mut emitter = RunEmitter::new(
            RunContext::new("thread-1"),
            tx,
            CancellationToken::new(),
        );
        emitter.start().await.unwrap();
        agent.run(&input, &mut emitter).await.unwrap();
        drop(emitter);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_canned_run_round_trips_reply() {
        let agent = CannedAnswerAgent::new()
            .with_reply_template("Answer to {q}.")
            .with_chunk_size(3)
            .with_chunk_delay(Duration::ZERO);
        let input = RunAgentInput::new().with_forwarded_prop("q", json!("life"));

        let events = collect_run(agent, input).await;

        let text: String = events.iter().filter_map(|e| e.delta()).collect();
        assert_eq!(text, "Answer to life.");

        let last = events.last().unwrap();
        assert_eq!(last.event_type(), EventType::RunFinished);
        assert!(events.iter().filter(|e| e.is_terminal()).count() == 1);
    }

    #[tokio::test]
    async fn test_canned_run_emits_step_and_citations() {
        let agent = CannedAnswerAgent::new()
            .with_chunk_delay(Duration::ZERO)
            .with_citations(vec![json!({"id": "c1"})]);
        let events = collect_run(agent, RunAgentInput::new()).await;

        let types: Vec<EventType> = events.iter().map(RunEvent::event_type).collect();
        let step_start = types
            .iter()
            .position(|t| *t == EventType::StepStarted)
            .unwrap();
        let step_end = types
            .iter()
            .position(|t| *t == EventType::StepFinished)
            .unwrap();
        let custom = types.iter().position(|t| *t == EventType::Custom).unwrap();
        assert!(step_start < custom && custom < step_end);
    }

    #[tokio::test]
    async fn test_chunked_encoding_has_no_framing() {
        let agent = CannedAnswerAgent::new()
            .with_reply_template("hello world")
            .with_chunk_size(4)
            .with_chunk_delay(Duration::ZERO)
            .with_chunked_encoding(true);
        let events = collect_run(agent, RunAgentInput::new()).await;

        assert!(events
            .iter()
            .all(|e| e.event_type() != EventType::TextMessageStart
                && e.event_type() != EventType::TextMessageEnd));
        let text: String = events.iter().filter_map(|e| e.delta()).collect();
        assert_eq!(text, "hello world");
    }
}
