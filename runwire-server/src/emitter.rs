//! Run emitter state machine.
//!
//! [`RunEmitter`] is the only way a producer puts events on the wire. It
//! enforces the protocol's ordering rules at emit time: RunStarted first
//! and exactly once, non-overlapping step pairs, framed messages opened
//! before content and closed exactly once, no encoding mixing per message
//! id, and exactly one terminal event, always last.
//!
//! Every emit observes the run's cancellation token and the channel to
//! the transport; a cancelled run or a departed client surfaces as
//! [`EmitError::Cancelled`] so producer loops stop promptly.

use crate::error::{EmitError, EmitResult};
use runwire_core::{RunContext, RunEvent};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Which encoding a message id has used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageEncoding {
    /// Start/content/end framing.
    Framed,
    /// Standalone chunk events.
    Chunked,
}

/// Ordered event emitter for one run.
///
/// Created per accepted run request, lives for the duration of the
/// stream, and is discarded after the terminal event.
pub struct RunEmitter {
    context: RunContext,
    tx: mpsc::Sender<RunEvent>,
    cancel: CancellationToken,
    started: bool,
    finished: bool,
    open_step: Option<String>,
    open_message: Option<String>,
    encodings: HashMap<String, MessageEncoding>,
}

impl RunEmitter {
    /// Create an emitter for the given run.
    pub fn new(context: RunContext, tx: mpsc::Sender<RunEvent>, cancel: CancellationToken) -> Self {
        Self {
            context,
            tx,
            cancel,
            started: false,
            finished: false,
            open_step: None,
            open_message: None,
            encodings: HashMap::new(),
        }
    }

    /// The identity of the run this emitter belongs to.
    #[must_use]
    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Whether RunStarted has been emitted.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether a terminal event has been emitted.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the run has been cancelled by the client side.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn emit(&mut self, event: RunEvent) -> EmitResult<()> {
        if self.cancel.is_cancelled() {
            return Err(EmitError::Cancelled);
        }
        debug!(run_id = %self.context.run_id, event_type = ?event.event_type(), "emit");
        self.tx.send(event).await.map_err(|_| EmitError::Cancelled)
    }

    fn ensure_live(&self) -> EmitResult<()> {
        if !self.started {
            return Err(EmitError::NotStarted);
        }
        if self.finished {
            return Err(EmitError::AlreadyFinished);
        }
        Ok(())
    }

    /// Emit RunStarted. Must be the first emission, exactly once.
    pub async fn start(&mut self) -> EmitResult<()> {
        if self.started {
            return Err(EmitError::AlreadyStarted);
        }
        let event = RunEvent::run_started(&self.context.thread_id, &self.context.run_id);
        self.emit(event).await?;
        self.started = true;
        Ok(())
    }

    /// Emit a custom event. Legal at any non-terminal point after start.
    pub async fn custom(&mut self, name: impl Into<String>, value: Value) -> EmitResult<()> {
        self.ensure_live()?;
        self.emit(RunEvent::custom(name, value)).await
    }

    /// Start a named step. Steps must not overlap.
    pub async fn step_started(&mut self, name: impl Into<String>) -> EmitResult<()> {
        self.ensure_live()?;
        let name = name.into();
        if let Some(open) = &self.open_step {
            return Err(EmitError::StepOverlap {
                open: open.clone(),
                requested: name,
            });
        }
        self.emit(RunEvent::step_started(&name)).await?;
        self.open_step = Some(name);
        Ok(())
    }

    /// Finish the open step. The name must match the step that started.
    pub async fn step_finished(&mut self, name: impl Into<String>) -> EmitResult<()> {
        self.ensure_live()?;
        let name = name.into();
        if self.open_step.as_deref() != Some(name.as_str()) {
            return Err(EmitError::StepNotOpen(name));
        }
        self.emit(RunEvent::step_finished(&name)).await?;
        self.open_step = None;
        Ok(())
    }

    /// Open a framed message. One message open at a time; ids are
    /// single-use.
    pub async fn message_start(&mut self, message_id: impl Into<String>) -> EmitResult<()> {
        self.ensure_live()?;
        let message_id = message_id.into();
        if let Some(open) = &self.open_message {
            return Err(EmitError::MessageAlreadyOpen {
                open: open.clone(),
                requested: message_id,
            });
        }
        match self.encodings.get(&message_id) {
            Some(MessageEncoding::Framed) => return Err(EmitError::MessageReused(message_id)),
            Some(MessageEncoding::Chunked) => return Err(EmitError::MixedEncoding(message_id)),
            None => {}
        }
        self.emit(RunEvent::text_message_start(&message_id)).await?;
        self.encodings
            .insert(message_id.clone(), MessageEncoding::Framed);
        self.open_message = Some(message_id);
        Ok(())
    }

    /// Emit a content delta for the open framed message.
    pub async fn message_content(
        &mut self,
        message_id: &str,
        delta: impl Into<String>,
    ) -> EmitResult<()> {
        self.ensure_live()?;
        if self.open_message.as_deref() != Some(message_id) {
            return Err(EmitError::MessageNotOpen(message_id.to_string()));
        }
        self.emit(RunEvent::text_message_content(message_id, delta))
            .await
    }

    /// Close the open framed message.
    pub async fn message_end(&mut self, message_id: &str) -> EmitResult<()> {
        self.ensure_live()?;
        if self.open_message.as_deref() != Some(message_id) {
            return Err(EmitError::MessageNotOpen(message_id.to_string()));
        }
        self.emit(RunEvent::text_message_end(message_id)).await?;
        self.open_message = None;
        Ok(())
    }

    /// Emit a standalone chunk. The id must not also use framed encoding.
    pub async fn message_chunk(
        &mut self,
        message_id: impl Into<String>,
        delta: impl Into<String>,
    ) -> EmitResult<()> {
        self.ensure_live()?;
        let message_id = message_id.into();
        if let Some(open) = &self.open_message {
            return Err(EmitError::MessageAlreadyOpen {
                open: open.clone(),
                requested: message_id,
            });
        }
        if self.encodings.get(&message_id) == Some(&MessageEncoding::Framed) {
            return Err(EmitError::MixedEncoding(message_id));
        }
        self.encodings
            .insert(message_id.clone(), MessageEncoding::Chunked);
        self.emit(RunEvent::text_message_chunk(message_id, delta))
            .await
    }

    /// Emit RunFinished. Open message/step are closed out first; no
    /// further emission is legal afterwards.
    pub async fn finish(&mut self, result: Option<Value>) -> EmitResult<()> {
        self.ensure_live()?;
        self.close_open().await?;
        let event = RunEvent::run_finished(&self.context.thread_id, &self.context.run_id, result);
        self.emit(event).await?;
        self.finished = true;
        Ok(())
    }

    /// Emit RunError. Open message/step are closed out first; no further
    /// emission is legal afterwards.
    pub async fn error(&mut self, message: impl Into<String>) -> EmitResult<()> {
        self.ensure_live()?;
        self.close_open().await?;
        self.emit(RunEvent::run_error(message)).await?;
        self.finished = true;
        Ok(())
    }

    async fn close_open(&mut self) -> EmitResult<()> {
        if let Some(message_id) = self.open_message.take() {
            self.emit(RunEvent::text_message_end(&message_id)).await?;
        }
        if let Some(step_name) = self.open_step.take() {
            self.emit(RunEvent::step_finished(&step_name)).await?;
        }
        Ok(())
    }
}
