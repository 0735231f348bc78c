//! HTTP query server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Answer a question with citations |
//! | `POST` | `/retrieve` | Ranked passages only, no generation |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": "failed to generate an answer" }
//! ```
//!
//! A malformed body or an empty question is a `400`. Every pipeline failure is a `500` with a
//! generic message; the cause is logged, never returned to the client.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! chat clients.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info};

use medrag_core::models::{Citation, RetrievedPassage};
use medrag_core::RagError;

use crate::assistant::Assistant;
use crate::config::Config;
use crate::db;

/// Starts the HTTP server on `[server].bind` and runs until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    crate::migrate::apply(&pool).await?;
    let assistant = Assistant::from_config(config, pool)?;
    assistant.check_ready().await?;

    let app = build_router(Arc::new(assistant));
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "server listening");
    println!("medrag server listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes with permissive CORS, ready to serve.
pub fn build_router(assistant: Arc<Assistant>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(handle_ask))
        .route("/retrieve", post(handle_retrieve))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(assistant)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

/// Malformed bodies get the same JSON error shape as every other failure.
fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            debug!(error = %rejection, "rejected request body");
            Err(bad_request("invalid request body"))
        }
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
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
pub struct AskRequest {
    pub question: String,
}

#[derive(Serialize)]
pub struct SourceRef {
    pub source: String,
    pub sequence_index: i64,
    pub similarity_score: f32,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub text: String,
    pub citations: Vec<Citation>,
    pub sources: Vec<SourceRef>,
}

async fn handle_ask(
    State(assistant): State<Arc<Assistant>>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let req = parse_body(body)?;
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let result = assistant.ask(&req.question).await.map_err(|e| {
        error!(error = %e, "failed to answer question");
        internal("failed to generate an answer")
    })?;

    Ok(Json(AskResponse {
        text: result.answer.text,
        citations: result.answer.citations,
        sources: result
            .passages
            .iter()
            .map(|p| SourceRef {
                source: p.chunk.source.clone(),
                sequence_index: p.chunk.sequence_index,
                similarity_score: p.similarity_score,
            })
            .collect(),
    }))
}

// ============ POST /retrieve ============

#[derive(Deserialize)]
pub struct RetrieveRequest {
    pub question: String,
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct RetrieveResponse {
    pub passages: Vec<RetrievedPassage>,
}

async fn handle_retrieve(
    State(assistant): State<Arc<Assistant>>,
    body: Result<Json<RetrieveRequest>, JsonRejection>,
) -> Result<Json<RetrieveResponse>, AppError> {
    let req = parse_body(body)?;
    let question = req.question.trim();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let k = req.k.unwrap_or_else(|| assistant.pipeline().top_k());

    let passages = assistant
        .pipeline()
        .retriever()
        .retrieve(question, k)
        .await
        .map_err(|e| match e {
            RagError::InvalidInput(msg) => bad_request(msg),
            other => {
                error!(error = %other, "failed to retrieve passages");
                internal("failed to retrieve passages")
            }
        })?;

    Ok(Json(RetrieveResponse { passages }))
}
