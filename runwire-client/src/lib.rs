//! # runwire-client
//!
//! The run client side of the runwire protocol.
//!
//! A run is opened with one POST and consumed as a single ordered event
//! stream. The pieces:
//!
//! - **[`HttpAgent`]**: issues the run request, decodes the stream, and
//!   dispatches each event to subscribers in arrival order; at most one
//!   run is active per agent (cancel-then-replace)
//! - **[`RunSubscriber`]**: capability-set callbacks; implement only the
//!   slots you care about
//! - **[`AnswerState`]**: pure reducer reconstructing messages, step
//!   progress, citations, and loading/error flags
//!
//! ## Example
//!
//! ```ignore
//! use runwire_client::{HttpAgent, StateSubscriber};
//! use runwire_core::RunAgentInput;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), runwire_client::ClientError> {
//! let agent = HttpAgent::new("http://localhost:3000/follow-up")
//!     .with_agent_id("unique-agent-id")
//!     .with_thread_id("my example thread");
//!
//! let state = StateSubscriber::new();
//! let _subscription = agent.subscribe(state.clone());
//!
//! let input = RunAgentInput::new().with_forwarded_prop("q", json!("hello"));
//! agent.run(input).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod agent;
pub mod error;
pub mod reducer;
pub mod subscriber;

// Re-exports
pub use agent::{HttpAgent, ANSWER_ID_HEADER};
pub use error::{ClientError, ClientResult};
pub use reducer::{AnswerError, AnswerState, Citation, Message, StateSubscriber, StepStatus};
pub use subscriber::{RunSubscriber, SubscriberSet, Subscription};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        AnswerState, ClientError, ClientResult, HttpAgent, RunSubscriber, StateSubscriber,
        Subscription,
    };
}
