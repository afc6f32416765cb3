//! # runwire-server
//!
//! The run producer side of the runwire protocol.
//!
//! A producer accepts one run request, synchronously decides the
//! thread/run identity, and emits a strictly ordered sequence of
//! lifecycle and content events terminated by exactly one of
//! RunFinished/RunError. The pieces:
//!
//! - **[`RunEmitter`]**: the ordering state machine every event passes
//!   through
//! - **[`RunAgent`]**: the seam for business logic; the emitter is its
//!   only channel to the client
//! - **[`CannedAnswerAgent`]**: demo agent streaming a templated reply
//! - **[`RunServer`]**: Axum endpoint streaming runs as SSE, with
//!   client-disconnect cancellation and a guaranteed terminal event on
//!   all paths
//!
//! ## Example
//!
//! ```ignore
//! use runwire_server::{CannedAnswerAgent, RunServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), runwire_server::ServerError> {
//!     let server = RunServer::new(CannedAnswerAgent::new());
//!     server.serve(([127, 0, 0, 1], 3000)).await
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod agent;
pub mod emitter;
pub mod error;
pub mod http;

// Re-exports
pub use agent::{CannedAnswerAgent, RunAgent};
pub use emitter::RunEmitter;
pub use error::{EmitError, EmitResult, ServerError};
pub use http::{RunServer, ANSWER_ID_HEADER};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        CannedAnswerAgent, EmitError, EmitResult, RunAgent, RunEmitter, RunServer, ServerError,
    };
}
