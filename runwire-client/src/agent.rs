//! HTTP run client.
//!
//! [`HttpAgent`] issues the run request, opens the event channel, and
//! fans decoded events out to registered subscribers in arrival order. At
//! most one run is active per agent: a new [`HttpAgent::run`] call
//! cancels the in-flight one before any of its own events are dispatched,
//! so a stale stream can never deliver events after a newer run has
//! begun.
//!
//! A transport failure (connection refused, non-success status, framing
//! error, or the stream closing without a terminal event) is surfaced to
//! subscribers as a synthesized RunError, so every run resolves to
//! exactly one terminal state from their point of view.

use crate::error::{ClientError, ClientResult};
use crate::subscriber::{RunSubscriber, SubscriberSet, Subscription};
use futures::{StreamExt, TryStreamExt};
use parking_lot::Mutex;
use reqwest::header;
use runwire_core::{FrameStream, RunAgentInput, RunEvent};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Response header carrying the generated answer identifier.
pub const ANSWER_ID_HEADER: &str = "x-answer-id";

struct RunHandle {
    seq: u64,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// HTTP client for one run endpoint.
///
/// The agent owns the single "current run" slot; it is the only mutable
/// state shared across runs and is always written under the
/// cancel-then-replace discipline.
pub struct HttpAgent {
    url: String,
    agent_id: Option<String>,
    thread_id: Option<String>,
    bearer_token: Option<String>,
    http: reqwest::Client,
    subscribers: Arc<SubscriberSet>,
    current_run: Mutex<Option<RunHandle>>,
    run_seq: Mutex<u64>,
    answer_id: Mutex<Option<String>>,
}

impl HttpAgent {
    /// Create an agent for the given endpoint url.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            agent_id: None,
            thread_id: None,
            bearer_token: None,
            http: reqwest::Client::new(),
            subscribers: Arc::new(SubscriberSet::new()),
            current_run: Mutex::new(None),
            run_seq: Mutex::new(0),
            answer_id: Mutex::new(None),
        }
    }

    /// Set the agent id sent with every run request.
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Set the thread id sent with every run request.
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Send `Authorization: Bearer <token>` with every run request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Use a preconfigured reqwest client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Register a subscriber; the returned handle deregisters it.
    ///
    /// Subscribers registered after a run has started receive events from
    /// that point forward only; there is no replay.
    pub fn subscribe(&self, subscriber: impl RunSubscriber + 'static) -> Subscription {
        SubscriberSet::subscribe(&self.subscribers, Box::new(subscriber))
    }

    /// The `x-answer-id` header from the most recently opened run.
    #[must_use]
    pub fn last_answer_id(&self) -> Option<String> {
        self.answer_id.lock().clone()
    }

    /// Cancel the in-flight run, if any. No further events for it will be
    /// dispatched.
    pub fn cancel(&self) {
        if let Some(previous) = self.current_run.lock().take() {
            previous.cancel.cancel();
            if let Some(task) = previous.task {
                task.abort();
            }
        }
    }

    /// Issue one run request and start dispatching its events.
    ///
    /// Suspends the caller only up to request submission: once the
    /// response stream is open, the decode/dispatch loop runs as a
    /// background task and this returns. A previous run still in flight
    /// is cancelled first.
    pub async fn run(&self, mut input: RunAgentInput) -> ClientResult<()> {
        if input.thread_id.is_none() {
            input.thread_id = self.thread_id.clone();
        }
        if input.agent_id.is_none() {
            input.agent_id = self.agent_id.clone();
        }

        let cancel = CancellationToken::new();
        let seq = {
            let mut run_seq = self.run_seq.lock();
            *run_seq += 1;
            *run_seq
        };

        // Cancel-then-replace: the previous run must be dead before the
        // new one can dispatch anything.
        {
            let mut slot = self.current_run.lock();
            if let Some(previous) = slot.take() {
                debug!(seq = previous.seq, "cancelling in-flight run");
                previous.cancel.cancel();
                if let Some(task) = previous.task {
                    task.abort();
                }
            }
            *slot = Some(RunHandle {
                seq,
                cancel: cancel.clone(),
                task: None,
            });
        }

        let mut request = self
            .http
            .post(&self.url)
            .header(header::ACCEPT, "text/event-stream")
            .header(header::CONTENT_TYPE, "application/json")
            .json(&input);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => {
                self.dispatch_transport_error(&cancel, format!("connection failed: {error}"));
                return Err(ClientError::Http(error));
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            self.dispatch_transport_error(&cancel, format!("request failed with status {status}"));
            return Err(ClientError::Status(status));
        }

        // A newer run may have started while we waited for headers; its
        // events own the subscribers now, so this run just goes away.
        if cancel.is_cancelled() {
            return Ok(());
        }

        let answer_id = response
            .headers()
            .get(ANSWER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        *self.answer_id.lock() = answer_id;

        let subscribers = Arc::clone(&self.subscribers);
        let token = cancel.clone();
        let task = tokio::spawn(dispatch_loop(response, subscribers, token));

        let mut slot = self.current_run.lock();
        if let Some(handle) = slot.as_mut() {
            if handle.seq == seq {
                handle.task = Some(task);
            }
        }
        Ok(())
    }

    fn dispatch_transport_error(&self, cancel: &CancellationToken, message: String) {
        if cancel.is_cancelled() {
            return;
        }
        warn!(%message, "run failed before streaming");
        self.subscribers
            .dispatch(&RunEvent::run_error_with_code(message, "transport"));
    }
}

/// Decode frames and fan each event out, in arrival order, until the
/// terminal event, cancellation, or the stream ends.
async fn dispatch_loop(
    response: reqwest::Response,
    subscribers: Arc<SubscriberSet>,
    cancel: CancellationToken,
) {
    let bytes = response
        .bytes_stream()
        .map_err(std::io::Error::other)
        .boxed();
    let mut frames = FrameStream::new(bytes);
    let mut saw_terminal = false;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = frames.next() => next,
        };

        match next {
            Some(Ok(event)) => {
                let terminal = event.is_terminal();
                debug!(event_type = ?event.event_type(), "dispatching event");
                subscribers.dispatch(&event);
                if terminal {
                    saw_terminal = true;
                    break;
                }
            }
            Some(Err(error)) => {
                warn!(%error, "framing error, aborting run");
                subscribers.dispatch(&RunEvent::run_error_with_code(
                    error.to_string(),
                    "framing",
                ));
                saw_terminal = true;
                break;
            }
            None => break,
        }
    }

    if !saw_terminal && !cancel.is_cancelled() {
        subscribers.dispatch(&RunEvent::run_error_with_code(
            "stream closed before a terminal event",
            "transport",
        ));
    }
}
