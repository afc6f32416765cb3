//! Client errors.

use runwire_core::FrameError;
use thiserror::Error;

/// Errors returned by the run client.
///
/// Whatever the caller sees here, subscribers have already been told: a
/// transport failure is also dispatched as a synthesized RunError so every
/// run resolves to exactly one terminal state from their point of view.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the connection failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The producer answered with a non-success status.
    #[error("Request failed with status {0}")]
    Status(u16),

    /// The event stream was not well-formed.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
