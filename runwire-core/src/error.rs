//! Framing errors.

use thiserror::Error;

/// Errors raised while framing or deframing the event stream.
#[derive(Debug, Error)]
pub enum FrameError {
    /// A record was received that is not a well-formed event.
    ///
    /// Carries the offending payload so callers can log what the peer
    /// actually sent. Fatal for the run it occurred on.
    #[error("Malformed event record: {source} (payload: {payload:?})")]
    Parse {
        /// The underlying JSON error.
        source: serde_json::Error,
        /// The record that failed to parse.
        payload: String,
    },

    /// The decode buffer grew past its bound without a record terminator.
    #[error("Frame buffer overflow")]
    BufferOverflow,

    /// IO error from the underlying transport.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for framing operations.
pub type FrameResult<T> = Result<T, FrameError>;
