//! Demo follow-up answer server.
//!
//! Serves the canned agent at `POST http://127.0.0.1:3000/follow-up`
//! (send `Accept: text/event-stream` and a JSON body like
//! `{"forwardedProps":{"q":"what is a query pipeline?"}}`).

use runwire_server::{CannedAnswerAgent, RunServer, ServerError};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let agent = CannedAnswerAgent::new().with_citations(vec![json!({
        "id": "c1",
        "title": "Query pipelines",
        "uri": "https://example.com/docs/query-pipelines",
    })]);

    RunServer::new(agent).serve(([127, 0, 0, 1], 3000)).await
}
