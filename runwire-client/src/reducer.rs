//! State reconstruction from the event stream.
//!
//! [`AnswerState::apply`] is a pure, total function from (state, event)
//! to new state: it never panics, and an event it does not recognize is a
//! no-op. Replaying the same decoded stream into a fresh state always
//! yields the same result.
//!
//! The reducer is deliberately permissive where the producer contract is
//! strict: a content delta for an unseen message id implicitly opens the
//! message (this also serves the chunk-only encoding), and messages still
//! open when RunFinished arrives are marked complete then.

use crate::subscriber::RunSubscriber;
use indexmap::IndexMap;
use parking_lot::RwLock;
use runwire_core::RunEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const DEFAULT_CONTENT_FORMAT: &str = "text/markdown";

/// Status of a named step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepStatus {
    /// The step has started and not yet finished.
    Running,
    /// The step has finished.
    Finished,
}

/// One reconstructed message, built by concatenating deltas in arrival
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message identifier.
    pub message_id: String,
    /// Role of the sender.
    pub role: String,
    /// Accumulated content.
    pub content: String,
    /// Content format (e.g. `text/markdown`).
    pub content_format: String,
    /// Whether the message has been closed.
    pub complete: bool,
}

impl Message {
    fn open(message_id: &str, role: Option<&str>, format: Option<&str>) -> Self {
        Self {
            message_id: message_id.to_string(),
            role: role.unwrap_or("assistant").to_string(),
            content: String::new(),
            content_format: format.unwrap_or(DEFAULT_CONTENT_FORMAT).to_string(),
            complete: false,
        }
    }
}

/// One citation backing the generated answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// Citation identifier.
    pub id: String,
    /// Human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Link to the cited document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Source system the citation came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Error recorded in the reconstructed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerError {
    /// Human-readable error message.
    pub message: String,
    /// Optional machine-readable error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Caller-visible state reconstructed from one run's event stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerState {
    /// Thread (conversation) identifier of the current run.
    pub thread_id: Option<String>,
    /// Run identifier of the current run.
    pub run_id: Option<String>,
    /// Answer identifier (keyed off the run id).
    pub answer_id: Option<String>,
    /// A run is in flight.
    pub is_loading: bool,
    /// Content is still arriving.
    pub is_streaming: bool,
    /// The run finished successfully.
    pub finished: bool,
    /// An answer was generated.
    pub is_answer_generated: bool,
    /// The producer reported it could not answer.
    pub cannot_answer: bool,
    /// Content format announced by the producer.
    pub content_format: Option<String>,
    /// Reconstructed messages, in arrival order.
    pub messages: IndexMap<String, Message>,
    /// Step progress, in arrival order.
    pub steps: IndexMap<String, StepStatus>,
    /// Citations, replaced wholesale by the `citations` custom event.
    pub citations: Vec<Citation>,
    /// Error recorded for this run, if any.
    pub error: Option<AnswerError>,
}

impl AnswerState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the run has resolved, to success or error.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.finished || self.error.is_some()
    }

    /// Look up a reconstructed message's content.
    #[must_use]
    pub fn message_content(&self, message_id: &str) -> Option<&str> {
        self.messages.get(message_id).map(|m| m.content.as_str())
    }

    /// Apply one event, producing the next state.
    #[must_use]
    pub fn apply(&self, event: &RunEvent) -> AnswerState {
        let mut next = self.clone();
        match event {
            RunEvent::RunStarted {
                thread_id, run_id, ..
            } => {
                next.thread_id = Some(thread_id.clone());
                next.run_id = Some(run_id.clone());
                next.answer_id = Some(run_id.clone());
                next.is_loading = true;
                next.is_streaming = true;
                next.finished = false;
                next.is_answer_generated = false;
                next.cannot_answer = false;
                next.error = None;
            }

            RunEvent::TextMessageStart {
                message_id, role, ..
            } => {
                next.ensure_message(message_id, role.as_deref());
            }

            RunEvent::TextMessageContent {
                message_id, delta, ..
            }
            | RunEvent::TextMessageChunk {
                message_id, delta, ..
            } => {
                next.ensure_message(message_id, None).content.push_str(delta);
            }

            RunEvent::TextMessageEnd { message_id, .. } => {
                next.ensure_message(message_id, None).complete = true;
            }

            RunEvent::StepStarted { step_name, .. } => {
                next.steps.insert(step_name.clone(), StepStatus::Running);
            }

            RunEvent::StepFinished { step_name, .. } => {
                next.steps.insert(step_name.clone(), StepStatus::Finished);
            }

            RunEvent::Custom { name, value, .. } => next.apply_custom(name, value),

            RunEvent::RunFinished { result, .. } => {
                next.is_loading = false;
                next.is_streaming = false;
                next.finished = true;
                for message in next.messages.values_mut() {
                    message.complete = true;
                }
                let generated = result
                    .as_ref()
                    .and_then(|r| r.get("generated"))
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                next.is_answer_generated = generated;
                next.cannot_answer = !generated;
            }

            RunEvent::RunError { message, code, .. } => {
                next.is_loading = false;
                next.is_streaming = false;
                next.error = Some(AnswerError {
                    message: message.clone(),
                    code: code.clone(),
                });
                // Partial message content stays visible.
            }

            RunEvent::Raw { .. } => {}
        }
        next
    }

    /// Fold a decoded event sequence into a state, starting empty.
    #[must_use]
    pub fn replay<'a, I>(events: I) -> AnswerState
    where
        I: IntoIterator<Item = &'a RunEvent>,
    {
        events
            .into_iter()
            .fold(AnswerState::new(), |state, event| state.apply(event))
    }

    fn ensure_message(&mut self, message_id: &str, role: Option<&str>) -> &mut Message {
        let format = self.content_format.clone();
        self.messages
            .entry(message_id.to_string())
            .or_insert_with(|| Message::open(message_id, role, format.as_deref()))
    }

    fn apply_custom(&mut self, name: &str, value: &Value) {
        match name {
            "citations" => {
                // Replace wholesale, last write wins; an unparseable
                // payload is a no-op rather than a panic.
                if let Some(list) = value.get("citations") {
                    if let Ok(citations) = serde_json::from_value(list.clone()) {
                        self.citations = citations;
                    }
                }
            }
            "contentFormat" => {
                if let Some(format) = value.as_str() {
                    self.content_format = Some(format.to_string());
                }
            }
            _ => {}
        }
    }
}

/// Subscriber adapter that feeds events through the reducer.
///
/// Clones share the same underlying state: register one clone on the
/// agent and keep another to read [`StateSubscriber::snapshot`].
#[derive(Clone, Default)]
pub struct StateSubscriber {
    state: Arc<RwLock<AnswerState>>,
}

impl StateSubscriber {
    /// Create a subscriber with empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the current reconstructed state.
    #[must_use]
    pub fn snapshot(&self) -> AnswerState {
        self.state.read().clone()
    }
}

impl RunSubscriber for StateSubscriber {
    fn on_event(&mut self, event: &RunEvent) {
        let mut state = self.state.write();
        *state = state.apply(event);
    }
}
