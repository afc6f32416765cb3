//! Run-event types.
//!
//! This module defines the events a run producer pushes to the client over
//! one event channel. All events share a `type` discriminator and an
//! optional millisecond `timestamp`; lifecycle events additionally carry
//! the thread/run identity.
//!
//! Events are organized into categories:
//! - **Run lifecycle**: `RUN_STARTED`, `RUN_FINISHED`, `RUN_ERROR`
//! - **Steps**: `STEP_STARTED`, `STEP_FINISHED`
//! - **Text messages**: `TEXT_MESSAGE_START`, `TEXT_MESSAGE_CONTENT`,
//!   `TEXT_MESSAGE_END`, plus the merged `TEXT_MESSAGE_CHUNK` encoding
//! - **Out-of-band**: `CUSTOM`, `RAW`

use crate::context::timestamp_millis;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Event type discriminator.
///
/// Mirrors the `type` tag of [`RunEvent`] without any payload, for
/// dispatch tables and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Run has started.
    RunStarted,
    /// Run has finished successfully.
    RunFinished,
    /// Run encountered an error.
    RunError,
    /// A named step has started.
    StepStarted,
    /// A named step has finished.
    StepFinished,
    /// Text message started.
    TextMessageStart,
    /// Text message content delta.
    TextMessageContent,
    /// Standalone text message chunk (merged start+content+end encoding).
    TextMessageChunk,
    /// Text message ended.
    TextMessageEnd,
    /// Application-specific event.
    Custom,
    /// Passthrough for event kinds this build does not recognize.
    Raw,
}

impl EventType {
    /// Resolve a wire tag to a known event type, if any.
    #[must_use]
    pub fn from_wire_tag(tag: &str) -> Option<Self> {
        match tag {
            "RUN_STARTED" => Some(Self::RunStarted),
            "RUN_FINISHED" => Some(Self::RunFinished),
            "RUN_ERROR" => Some(Self::RunError),
            "STEP_STARTED" => Some(Self::StepStarted),
            "STEP_FINISHED" => Some(Self::StepFinished),
            "TEXT_MESSAGE_START" => Some(Self::TextMessageStart),
            "TEXT_MESSAGE_CONTENT" => Some(Self::TextMessageContent),
            "TEXT_MESSAGE_CHUNK" => Some(Self::TextMessageChunk),
            "TEXT_MESSAGE_END" => Some(Self::TextMessageEnd),
            "CUSTOM" => Some(Self::Custom),
            "RAW" => Some(Self::Raw),
            _ => None,
        }
    }
}

/// One event pushed from a run producer to the client.
///
/// Events are immutable, value-typed, and ordered only by stream arrival;
/// there is no sequence number. The ordering rules the producer must
/// follow are enforced by `runwire-server`'s emitter, and the client side
/// reconstructs state from whatever arrives (see `runwire-client`).
///
/// Two encodings exist for streamed message text: the framed
/// start/content/end triple, and standalone [`RunEvent::TextMessageChunk`]
/// events that each carry a complete delta. A producer must not mix the
/// two encodings for the same `message_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum RunEvent {
    /// Run has started. First event of every stream.
    RunStarted {
        /// Thread (conversation) identifier.
        thread_id: String,
        /// Run identifier, fresh per run.
        run_id: String,
        /// Timestamp in milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Run has finished successfully. Terminal.
    RunFinished {
        /// Thread (conversation) identifier.
        thread_id: String,
        /// Run identifier.
        run_id: String,
        /// Optional result payload (e.g. `{"generated": true}`).
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        /// Timestamp in milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Run failed. Terminal.
    RunError {
        /// Human-readable error message.
        message: String,
        /// Optional machine-readable error code.
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        /// Timestamp in milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// A named step has started.
    StepStarted {
        /// Step name.
        step_name: String,
        /// Timestamp in milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// A named step has finished.
    StepFinished {
        /// Step name.
        step_name: String,
        /// Timestamp in milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Text message started (framed encoding).
    TextMessageStart {
        /// Message identifier.
        message_id: String,
        /// Role of the message sender.
        #[serde(skip_serializing_if = "Option::is_none")]
        role: Option<String>,
        /// Timestamp in milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Text message content delta (framed encoding).
    TextMessageContent {
        /// Message identifier.
        message_id: String,
        /// Incremental text fragment.
        delta: String,
        /// Timestamp in milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Standalone text chunk: a complete delta without start/end framing.
    TextMessageChunk {
        /// Message identifier.
        message_id: String,
        /// Incremental text fragment.
        delta: String,
        /// Timestamp in milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Text message ended (framed encoding).
    TextMessageEnd {
        /// Message identifier.
        message_id: String,
        /// Timestamp in milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Application-specific event (e.g. citation payloads, response
    /// format) interleaved at any non-terminal point.
    Custom {
        /// Event name/subtype.
        name: String,
        /// Event payload.
        value: Value,
        /// Timestamp in milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    /// Passthrough for records whose `type` tag this build does not
    /// recognize. Produced by the frame decoder, never by an emitter.
    Raw {
        /// The original record, verbatim.
        data: Value,
        /// Timestamp in milliseconds.
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },
}

impl RunEvent {
    /// Create a run started event.
    pub fn run_started(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self::RunStarted {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            timestamp: Some(timestamp_millis()),
        }
    }

    /// Create a run finished event.
    pub fn run_finished(
        thread_id: impl Into<String>,
        run_id: impl Into<String>,
        result: Option<Value>,
    ) -> Self {
        Self::RunFinished {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            result,
            timestamp: Some(timestamp_millis()),
        }
    }

    /// Create a run error event.
    pub fn run_error(message: impl Into<String>) -> Self {
        Self::RunError {
            message: message.into(),
            code: None,
            timestamp: Some(timestamp_millis()),
        }
    }

    /// Create a run error event with a machine-readable code.
    pub fn run_error_with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::RunError {
            message: message.into(),
            code: Some(code.into()),
            timestamp: Some(timestamp_millis()),
        }
    }

    /// Create a step started event.
    pub fn step_started(step_name: impl Into<String>) -> Self {
        Self::StepStarted {
            step_name: step_name.into(),
            timestamp: Some(timestamp_millis()),
        }
    }

    /// Create a step finished event.
    pub fn step_finished(step_name: impl Into<String>) -> Self {
        Self::StepFinished {
            step_name: step_name.into(),
            timestamp: Some(timestamp_millis()),
        }
    }

    /// Create a text message start event with the default assistant role.
    pub fn text_message_start(message_id: impl Into<String>) -> Self {
        Self::TextMessageStart {
            message_id: message_id.into(),
            role: Some("assistant".to_string()),
            timestamp: Some(timestamp_millis()),
        }
    }

    /// Create a text message content event.
    pub fn text_message_content(message_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::TextMessageContent {
            message_id: message_id.into(),
            delta: delta.into(),
            timestamp: Some(timestamp_millis()),
        }
    }

    /// Create a standalone text message chunk event.
    pub fn text_message_chunk(message_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::TextMessageChunk {
            message_id: message_id.into(),
            delta: delta.into(),
            timestamp: Some(timestamp_millis()),
        }
    }

    /// Create a text message end event.
    pub fn text_message_end(message_id: impl Into<String>) -> Self {
        Self::TextMessageEnd {
            message_id: message_id.into(),
            timestamp: Some(timestamp_millis()),
        }
    }

    /// Create a custom event.
    pub fn custom(name: impl Into<String>, value: Value) -> Self {
        Self::Custom {
            name: name.into(),
            value,
            timestamp: Some(timestamp_millis()),
        }
    }

    /// Get this event's type discriminator.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        match self {
            Self::RunStarted { .. } => EventType::RunStarted,
            Self::RunFinished { .. } => EventType::RunFinished,
            Self::RunError { .. } => EventType::RunError,
            Self::StepStarted { .. } => EventType::StepStarted,
            Self::StepFinished { .. } => EventType::StepFinished,
            Self::TextMessageStart { .. } => EventType::TextMessageStart,
            Self::TextMessageContent { .. } => EventType::TextMessageContent,
            Self::TextMessageChunk { .. } => EventType::TextMessageChunk,
            Self::TextMessageEnd { .. } => EventType::TextMessageEnd,
            Self::Custom { .. } => EventType::Custom,
            Self::Raw { .. } => EventType::Raw,
        }
    }

    /// Get the timestamp (milliseconds since epoch), if set.
    #[must_use]
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Self::RunStarted { timestamp, .. }
            | Self::RunFinished { timestamp, .. }
            | Self::RunError { timestamp, .. }
            | Self::StepStarted { timestamp, .. }
            | Self::StepFinished { timestamp, .. }
            | Self::TextMessageStart { timestamp, .. }
            | Self::TextMessageContent { timestamp, .. }
            | Self::TextMessageChunk { timestamp, .. }
            | Self::TextMessageEnd { timestamp, .. }
            | Self::Custom { timestamp, .. }
            | Self::Raw { timestamp, .. } => *timestamp,
        }
    }

    /// Check if this is a terminal event (run finished or run error).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunFinished { .. } | Self::RunError { .. })
    }

    /// Check if this is an error event.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::RunError { .. })
    }

    /// Get the message id if this event belongs to a streamed message.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::TextMessageStart { message_id, .. }
            | Self::TextMessageContent { message_id, .. }
            | Self::TextMessageChunk { message_id, .. }
            | Self::TextMessageEnd { message_id, .. } => Some(message_id),
            _ => None,
        }
    }

    /// Get the text delta if this is a content or chunk event.
    #[must_use]
    pub fn delta(&self) -> Option<&str> {
        match self {
            Self::TextMessageContent { delta, .. } | Self::TextMessageChunk { delta, .. } => {
                Some(delta)
            }
            _ => None,
        }
    }
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunStarted { run_id, .. } => write!(f, "[run_started] {}", run_id),
            Self::RunFinished { run_id, .. } => write!(f, "[run_finished] {}", run_id),
            Self::RunError { message, .. } => write!(f, "[run_error] {}", message),
            Self::StepStarted { step_name, .. } => write!(f, "[step_started] {}", step_name),
            Self::StepFinished { step_name, .. } => write!(f, "[step_finished] {}", step_name),
            Self::TextMessageStart { message_id, .. } => {
                write!(f, "[message_start] {}", message_id)
            }
            Self::TextMessageContent { delta, .. } => write!(f, "{}", delta),
            Self::TextMessageChunk { delta, .. } => write!(f, "{}", delta),
            Self::TextMessageEnd { message_id, .. } => write!(f, "[message_end] {}", message_id),
            Self::Custom { name, .. } => write!(f, "[custom] {}", name),
            Self::Raw { .. } => write!(f, "[raw]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_started_wire_shape() {
        let event = RunEvent::run_started("thread-1", "run-1");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"RUN_STARTED"#));
        assert!(json.contains(r#""threadId":"thread-1"#));
        assert!(json.contains(r#""runId":"run-1"#));
        assert!(json.contains(r#""timestamp":"#));
    }

    #[test]
    fn test_text_message_content_wire_shape() {
        let event = RunEvent::text_message_content("msg-1", "Hello, world!");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"TEXT_MESSAGE_CONTENT"#));
        assert!(json.contains(r#""messageId":"msg-1"#));
        assert!(json.contains(r#""delta":"Hello, world!"#));
    }

    #[test]
    fn test_step_events_wire_shape() {
        let started = RunEvent::step_started("retrieve");
        let json = serde_json::to_string(&started).unwrap();
        assert!(json.contains(r#""type":"STEP_STARTED"#));
        assert!(json.contains(r#""stepName":"retrieve"#));

        let finished = RunEvent::step_finished("retrieve");
        assert_eq!(finished.event_type(), EventType::StepFinished);
    }

    #[test]
    fn test_round_trip() {
        let events = vec![
            RunEvent::run_started("t", "r"),
            RunEvent::step_started("retrieve"),
            RunEvent::custom("citations", json!({"citations": [{"id": "c1"}]})),
            RunEvent::step_finished("retrieve"),
            RunEvent::text_message_start("m1"),
            RunEvent::text_message_content("m1", "Hi"),
            RunEvent::text_message_chunk("m2", "solo"),
            RunEvent::text_message_end("m1"),
            RunEvent::run_finished("t", "r", Some(json!({"generated": true}))),
            RunEvent::run_error("boom"),
        ];
        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            let back: RunEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(back, event);
        }
    }

    #[test]
    fn test_terminal_events() {
        assert!(RunEvent::run_finished("t", "r", None).is_terminal());
        assert!(RunEvent::run_error("oops").is_terminal());
        assert!(RunEvent::run_error("oops").is_error());
        assert!(!RunEvent::run_started("t", "r").is_terminal());
        assert!(!RunEvent::text_message_chunk("m", "x").is_terminal());
    }

    #[test]
    fn test_message_id_and_delta() {
        let event = RunEvent::text_message_content("m1", "Hi");
        assert_eq!(event.message_id(), Some("m1"));
        assert_eq!(event.delta(), Some("Hi"));

        let chunk = RunEvent::text_message_chunk("m2", "yo");
        assert_eq!(chunk.message_id(), Some("m2"));
        assert_eq!(chunk.delta(), Some("yo"));

        assert_eq!(RunEvent::run_started("t", "r").message_id(), None);
        assert_eq!(RunEvent::text_message_end("m1").delta(), None);
    }

    #[test]
    fn test_deserialize_without_timestamp() {
        let event: RunEvent =
            serde_json::from_str(r#"{"type":"TEXT_MESSAGE_END","messageId":"m1"}"#).unwrap();
        assert_eq!(event.event_type(), EventType::TextMessageEnd);
        assert_eq!(event.timestamp(), None);
    }

    #[test]
    fn test_missing_required_field_is_an_error() {
        let result = serde_json::from_str::<RunEvent>(r#"{"type":"TEXT_MESSAGE_CONTENT","messageId":"m1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_wire_tag() {
        assert_eq!(
            EventType::from_wire_tag("RUN_STARTED"),
            Some(EventType::RunStarted)
        );
        assert_eq!(
            EventType::from_wire_tag("TEXT_MESSAGE_CHUNK"),
            Some(EventType::TextMessageChunk)
        );
        assert_eq!(EventType::from_wire_tag("TOOL_CALL_START"), None);
    }

    #[test]
    fn test_display() {
        let event = RunEvent::text_message_content("m1", "test");
        assert_eq!(format!("{}", event), "test");
        let event = RunEvent::run_error("bad");
        assert_eq!(format!("{}", event), "[run_error] bad");
    }
}
