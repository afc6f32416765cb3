//! Run identity and ID generation.
//!
//! This module provides the server-side identity for one run and the
//! prefixed-UUID generators used for runs, threads, messages, and the
//! out-of-band answer header.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a unique run ID.
///
/// Returns a UUID v4 string prefixed with `run_`. Run IDs never repeat
/// within the process lifetime and scope reconstructed state on the
/// client.
///
/// # Example
///
/// ```rust
/// use runwire_core::context::generate_run_id;
///
/// let id = generate_run_id();
/// assert!(id.starts_with("run_"));
/// ```
#[must_use]
pub fn generate_run_id() -> String {
    format!("run_{}", Uuid::new_v4().simple())
}

/// Generate a unique thread ID.
///
/// Returns a UUID v4 string prefixed with `thread_`, used when the client
/// did not supply a thread identity of its own.
#[must_use]
pub fn generate_thread_id() -> String {
    format!("thread_{}", Uuid::new_v4().simple())
}

/// Generate a unique message ID.
///
/// Returns a UUID v4 string prefixed with `msg_`.
#[must_use]
pub fn generate_message_id() -> String {
    format!("msg_{}", Uuid::new_v4().simple())
}

/// Generate a unique answer ID for the out-of-band response header.
#[must_use]
pub fn generate_answer_id() -> String {
    format!("answer_{}", Uuid::new_v4().simple())
}

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Server-side identity for one run.
///
/// Created when a run request is accepted, lives for the duration of the
/// event stream, and is discarded after the terminal event. Never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunContext {
    /// Thread (conversation) identifier.
    pub thread_id: String,
    /// Run identifier, fresh per run.
    pub run_id: String,
}

impl RunContext {
    /// Create a context for an existing thread with a fresh run ID.
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: generate_run_id(),
        }
    }

    /// Create a context with both a fresh thread ID and a fresh run ID.
    #[must_use]
    pub fn fresh() -> Self {
        Self::new(generate_thread_id())
    }
}
