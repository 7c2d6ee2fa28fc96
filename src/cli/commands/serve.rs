//! HTTP interface.
//!
//! Every endpoint answers with the current session snapshot, so a page can
//! poll `GET /state` for progress after triggering an action.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::{ErrorKind, Url2TldrError};
use crate::orchestrator::Orchestrator;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    url: Option<String>,
    settings: Settings,
) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::new(&settings)?;

    if let Some(url) = &url {
        let seq = orchestrator.submit_url(url);
        tracing::info!(seq, "Submitted prefilled URL");
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("url2tldr");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("State", "GET  /state");
    Output::kv("Submit URL", "POST /prompt");
    Output::kv("Probe runtime", "POST /runtime/probe");
    Output::kv("Run model", "POST /run");
    Output::kv("Retry run", "POST /run/retry");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(orchestrator)).await?;

    Ok(())
}

/// Build the HTTP router around a session.
pub fn router(orchestrator: Orchestrator) -> Router {
    let state = Arc::new(AppState { orchestrator });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/state", get(current_state))
        .route("/prompt", post(submit_prompt))
        .route("/runtime/probe", post(probe_runtime))
        .route("/run", post(run_model))
        .route("/run/retry", post(retry_run))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct PromptRequest {
    url: String,
}

#[derive(Deserialize)]
struct RunRequestBody {
    model: String,
    /// Edited prompt text. The current prompt is used when absent.
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: ErrorKind,
    message: &'static str,
}

fn error_response(err: Url2TldrError) -> Response {
    let kind = err.kind();
    let status = match &err {
        Url2TldrError::InvalidTransition(_) => StatusCode::CONFLICT,
        Url2TldrError::ModelNotFound(_) => StatusCode::NOT_FOUND,
        Url2TldrError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind,
            message: kind.user_message(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn current_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.orchestrator.snapshot())
}

async fn submit_prompt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PromptRequest>,
) -> impl IntoResponse {
    state.orchestrator.submit_url(&req.url);
    (StatusCode::ACCEPTED, Json(state.orchestrator.snapshot()))
}

async fn probe_runtime(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.probe_runtime() {
        Ok(_) => (StatusCode::ACCEPTED, Json(state.orchestrator.snapshot())).into_response(),
        Err(e) => error_response(e),
    }
}

async fn run_model(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunRequestBody>,
) -> Response {
    let started = match &req.prompt {
        Some(text) => state.orchestrator.run_with_prompt(&req.model, text),
        None => state.orchestrator.run_model(&req.model),
    };
    match started {
        Ok(_) => (StatusCode::ACCEPTED, Json(state.orchestrator.snapshot())).into_response(),
        Err(e) => error_response(e),
    }
}

async fn retry_run(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.retry_run() {
        Ok(_) => (StatusCode::ACCEPTED, Json(state.orchestrator.snapshot())).into_response(),
        Err(e) => error_response(e),
    }
}
