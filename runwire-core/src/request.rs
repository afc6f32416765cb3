//! Run request types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input for running an agent, sent once per run as the request body.
///
/// Immutable once sent. `thread_id` names the conversation the run belongs
/// to (the producer assigns one when absent), `agent_id` selects the agent,
/// and `forwarded_props` carries the caller's free-form payload (e.g. the
/// question being asked).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentInput {
    /// Thread (conversation) identifier, if the caller has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Agent identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Caller-defined payload forwarded to the agent verbatim.
    #[serde(default)]
    pub forwarded_props: Map<String, Value>,
}

impl RunAgentInput {
    /// Create an empty run request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the thread ID.
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Set the agent ID.
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Add one forwarded property.
    pub fn with_forwarded_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.forwarded_props.insert(key.into(), value);
        self
    }

    /// Look up a forwarded property as a string.
    #[must_use]
    pub fn forwarded_str(&self, key: &str) -> Option<&str> {
        self.forwarded_props.get(key).and_then(Value::as_str)
    }
}
