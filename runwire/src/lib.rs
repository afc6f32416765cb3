//! # runwire - Agent Run-Event Streaming for Rust
//!
//! runwire lets a client start a long-running agent computation on a
//! server and receive its progress and output as an ordered stream of
//! typed events over a single request/response channel, while the client
//! reconstructs structured state (messages, step progress, citations,
//! loading/error flags) from that stream incrementally.
//!
//! ## Quick Start
//!
//! Server side:
//!
//! ```ignore
//! use runwire::server::{CannedAnswerAgent, RunServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), runwire::server::ServerError> {
//!     RunServer::new(CannedAnswerAgent::new())
//!         .serve(([127, 0, 0, 1], 3000))
//!         .await
//! }
//! ```
//!
//! Client side:
//!
//! ```ignore
//! use runwire::client::{HttpAgent, StateSubscriber};
//! use runwire::RunAgentInput;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), runwire::client::ClientError> {
//! let agent = HttpAgent::new("http://localhost:3000/follow-up");
//! let state = StateSubscriber::new();
//! let _subscription = agent.subscribe(state.clone());
//!
//! agent
//!     .run(RunAgentInput::new().with_forwarded_prop("q", json!("hello")))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! runwire is organized as a workspace of focused crates:
//!
//! - [`runwire_core`] - event vocabulary, run requests, SSE framing
//! - [`runwire_client`] - HTTP agent, subscribers, state reducer
//! - [`runwire_server`] - emitter state machine, agent trait, Axum endpoint
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `client` | Run client (`reqwest`) | ✅ |
//! | `server` | Run producer (`axum`) | ✅ |
//! | `full` | Everything | ❌ |

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub use runwire_core::{
    decode_event, encode_frame, EventType, FrameDecoder, FrameError, FrameResult, FrameStream,
    OutputFormat, RunAgentInput, RunContext, RunEvent,
};

/// Core protocol types (always available).
pub mod core {
    pub use runwire_core::*;
}

/// Run client: HTTP agent, subscribers, state reconstruction.
#[cfg(feature = "client")]
pub mod client {
    pub use runwire_client::*;
}

/// Run producer: emitter, agent trait, HTTP endpoint.
#[cfg(feature = "server")]
pub mod server {
    pub use runwire_server::*;
}

/// Prelude for common imports.
pub mod prelude {
    pub use runwire_core::prelude::*;

    #[cfg(feature = "client")]
    pub use runwire_client::prelude::*;

    #[cfg(feature = "server")]
    pub use runwire_server::prelude::*;
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let event = RunEvent::run_started("t", "r");
        assert!(!event.is_terminal());
        let _ = OutputFormat::default();
    }
}
