//! # runwire-core
//!
//! Core types for the runwire agent run-event protocol.
//!
//! A run is one execution of an agent from request to terminal event. The
//! producer pushes a strictly ordered sequence of typed [`RunEvent`]s over
//! a single server-to-client channel, framed as Server-Sent Events; the
//! client decodes them back and reconstructs state incrementally.
//!
//! ## Core Concepts
//!
//! - **[`RunEvent`]**: the event vocabulary (lifecycle, steps, message
//!   text, custom payloads)
//! - **[`RunAgentInput`]**: the one request that opens a run
//! - **[`RunContext`]**: server-side identity for one run
//! - **[`FrameDecoder`] / [`FrameStream`]**: transport framing with
//!   reassembly of records split across delivery boundaries
//!
//! ## Example - Framing
//!
//! ```rust
//! use runwire_core::{encode_frame, FrameDecoder, OutputFormat, RunEvent};
//!
//! let event = RunEvent::text_message_content("msg-1", "hello");
//! let frame = encode_frame(&event, OutputFormat::Sse);
//!
//! let mut decoder = FrameDecoder::new();
//! decoder.feed_str(&frame).unwrap();
//! assert_eq!(decoder.next_event(), Some(event));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod context;
pub mod error;
pub mod events;
pub mod frame;
pub mod request;

// Re-exports
pub use context::{
    generate_answer_id, generate_message_id, generate_run_id, generate_thread_id, RunContext,
};
pub use error::{FrameError, FrameResult};
pub use events::{EventType, RunEvent};
pub use frame::{decode_event, encode_frame, FrameDecoder, FrameStream, OutputFormat};
pub use request::RunAgentInput;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        decode_event, encode_frame, EventType, FrameDecoder, FrameError, FrameResult, FrameStream,
        OutputFormat, RunAgentInput, RunContext, RunEvent,
    };
}
