//! HTTP endpoint for the run producer.
//!
//! One `POST` route accepts a [`RunAgentInput`] body and answers with a
//! `text/event-stream` response whose body is the run's frame sequence,
//! terminated by the connection closing after the terminal event. The
//! response also carries the generated answer id out of band in the
//! `x-answer-id` header.
//!
//! The client closing the connection drops the body stream, which cancels
//! the run token shared with the emitter, so producers stop emitting for
//! departed clients.

use crate::agent::RunAgent;
use crate::emitter::RunEmitter;
use crate::error::{EmitError, EmitResult, ServerError};
use axum::body::Body;
use axum::extract::{Json, State};
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use runwire_core::{
    encode_frame, generate_answer_id, generate_thread_id, OutputFormat, RunAgentInput, RunContext,
    RunEvent,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Response header carrying the generated answer identifier.
pub const ANSWER_ID_HEADER: &str = "x-answer-id";

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Shared state for the run endpoint.
struct RunState {
    agent: Arc<dyn RunAgent>,
}

/// HTTP server exposing one agent as a run endpoint.
pub struct RunServer {
    agent: Arc<dyn RunAgent>,
    path: String,
}

impl RunServer {
    /// Create a server for the given agent, served at `/follow-up`.
    pub fn new(agent: impl RunAgent + 'static) -> Self {
        Self {
            agent: Arc::new(agent),
            path: "/follow-up".to_string(),
        }
    }

    /// Change the route the run endpoint is mounted at.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Create an Axum router for the run endpoint.
    pub fn router(&self) -> Router {
        let state = Arc::new(RunState {
            agent: self.agent.clone(),
        });

        Router::new()
            .route(&self.path, post(run_agent))
            .route("/health", get(health_check))
            .with_state(state)
    }

    /// Start serving on the given address.
    ///
    /// Binds a listener and blocks until the server shuts down.
    pub async fn serve(self, addr: impl Into<SocketAddr>) -> Result<(), ServerError> {
        let addr = addr.into();
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(e.to_string()))?;
        info!(%addr, path = %self.path, "run server listening");

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))
    }
}

/// POST handler: accept a run request, stream its events back.
#[instrument(skip(state, input))]
async fn run_agent(
    State(state): State<Arc<RunState>>,
    Json(input): Json<RunAgentInput>,
) -> Response<Body> {
    let thread_id = input
        .thread_id
        .clone()
        .unwrap_or_else(generate_thread_id);
    let context = RunContext::new(thread_id);
    let answer_id = generate_answer_id();
    info!(
        thread_id = %context.thread_id,
        run_id = %context.run_id,
        agent_id = input.agent_id.as_deref().unwrap_or("-"),
        "run accepted"
    );

    let (tx, rx) = mpsc::channel::<RunEvent>(EVENT_CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();

    let agent = state.agent.clone();
    let run_token = cancel.clone();
    tokio::spawn(async move {
        let mut emitter = RunEmitter::new(context, tx, run_token);
        match drive_agent(agent.as_ref(), &input, &mut emitter).await {
            Ok(()) => {}
            Err(EmitError::Cancelled) => {
                debug!(run_id = %emitter.context().run_id, "run cancelled by client")
            }
            Err(error) => {
                warn!(run_id = %emitter.context().run_id, %error, "run failed")
            }
        }
    });

    // Dropping the body (client disconnect or normal end) cancels the run.
    let guard = cancel.drop_guard();
    let frames = futures::stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let event = rx.recv().await?;
        let frame = encode_frame(&event, OutputFormat::Sse);
        Some((Ok::<_, Infallible>(Bytes::from(frame)), (rx, guard)))
    });

    match Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header(ANSWER_ID_HEADER, answer_id)
        .body(Body::from_stream(frames))
    {
        Ok(response) => response,
        Err(error) => {
            warn!(%error, "failed to build stream response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Bracket one agent run so a terminal event is emitted on all paths.
async fn drive_agent(
    agent: &dyn RunAgent,
    input: &RunAgentInput,
    emitter: &mut RunEmitter,
) -> EmitResult<()> {
    emitter.start().await?;

    match agent.run(input, emitter).await {
        Ok(()) => {
            if !emitter.is_finished() {
                emitter.finish(None).await?;
            }
            Ok(())
        }
        Err(EmitError::Cancelled) => Err(EmitError::Cancelled),
        Err(error) => {
            if !emitter.is_finished() {
                emitter.error(error.to_string()).await?;
            }
            Err(error)
        }
    }
}

/// GET /health - liveness probe.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "runwire"
    }))
}
