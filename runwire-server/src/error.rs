//! Producer-side errors.

use thiserror::Error;

/// Errors raised while emitting run events.
///
/// Ordering violations are rejected at emit time rather than silently
/// reordered: the producer is the party under contract, so a bad call
/// sequence is a bug in the agent, not something to paper over.
#[derive(Debug, Error)]
pub enum EmitError {
    /// An event other than RunStarted was emitted before the run started.
    #[error("Run has not started yet")]
    NotStarted,

    /// RunStarted was emitted twice.
    #[error("Run already started")]
    AlreadyStarted,

    /// An event was emitted after the terminal event.
    #[error("Run already finished")]
    AlreadyFinished,

    /// A step was started while another step is still open.
    #[error("Step {requested:?} started while step {open:?} is still open")]
    StepOverlap {
        /// The step that is currently open.
        open: String,
        /// The step the caller tried to start.
        requested: String,
    },

    /// A step was finished that is not the open one.
    #[error("Step {0:?} is not open")]
    StepNotOpen(String),

    /// A message was started while another message is still open.
    #[error("Message {requested:?} started while message {open:?} is still open")]
    MessageAlreadyOpen {
        /// The message that is currently open.
        open: String,
        /// The message the caller tried to start.
        requested: String,
    },

    /// Content or end was emitted for a message that is not open.
    #[error("Message {0:?} is not open")]
    MessageNotOpen(String),

    /// A closed message id was opened a second time.
    #[error("Message id {0:?} was already used")]
    MessageReused(String),

    /// Framed and chunked encodings were mixed for one message id.
    #[error("Mixed framed and chunked encodings for message {0:?}")]
    MixedEncoding(String),

    /// The run was cancelled: the client went away or the channel closed.
    #[error("Run cancelled")]
    Cancelled,

    /// The agent computation itself failed.
    #[error("Agent failed: {0}")]
    Agent(String),
}

impl EmitError {
    /// Create an agent failure from any displayable error.
    pub fn agent<E: std::fmt::Display>(err: E) -> Self {
        Self::Agent(err.to_string())
    }
}

/// Result type for emit operations.
pub type EmitResult<T> = Result<T, EmitError>;

/// Errors raised while serving the HTTP endpoint.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not bind the requested address.
    #[error("Failed to bind to address: {0}")]
    Bind(String),
    /// The server failed while running.
    #[error("Server error: {0}")]
    Serve(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = EmitError::StepOverlap {
            open: "retrieve".to_string(),
            requested: "generate".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Step \"generate\" started while step \"retrieve\" is still open"
        );
    }

    #[test]
    fn test_agent_helper() {
        let err = EmitError::agent("boom");
        assert_eq!(err.to_string(), "Agent failed: boom");
    }
}
