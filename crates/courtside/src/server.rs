//! HTTP server.
//!
//! Exposes question answering as a JSON API. The orchestrator (store,
//! providers, and loaded embedding index) is built once at startup and
//! shared by every request.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Answer a question, returns answer + trace |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

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

use courtside_core::orchestrator::Orchestrator;

use crate::ask::{ask_question, AskResponse};
use crate::config::Config;
use crate::engine;

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
    model: Arc<str>,
}

/// Build the router around an existing orchestrator.
pub fn router(orchestrator: Arc<Orchestrator>, model: &str) -> Router {
    let state = AppState {
        orchestrator,
        model: Arc::from(model),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Start the server on `server.bind`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let orchestrator = Arc::new(engine::build_orchestrator(config).await?);
    let app = router(orchestrator, &config.llm.model);

    let bind_addr = config.server.bind.clone();
    println!("Courtside server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    max_iterations: Option<u32>,
}

/// Handler for `POST /ask`.
///
/// The orchestrator never fails a run, so the only errors here are request
/// validation errors.
async fn handle_ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if request.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    if request.max_iterations == Some(0) {
        return Err(bad_request("max_iterations must be >= 1"));
    }

    let response = ask_question(
        &state.orchestrator,
        &state.model,
        &request.question,
        request.max_iterations,
    )
    .await;
    Ok(Json(response))
}
