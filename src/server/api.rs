//! HTTP API over the chat and embedding models.
//!
//! - GET /api/v1/text?question=...         → `{"answer": ...}`
//! - GET /api/v1/text/stream?question=...  → NDJSON, one `{"answer": ...}` per chunk
//! - GET /api/v1/embedding?text=...        → `{"output": [...], "index": n}`
//! - GET /hi, /hi/stream                   → plain text / SSE greeting routes
//! - GET /health

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::stream::{self, Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::model::{ChatModel, ChatResponse, Embedding, EmbeddingModel, ModelError};
use crate::prompt::{ChatOptions, Message, Prompt, PromptBuilder};
use crate::server::error::ApiError;
use crate::server::streaming::{ndjson_line, spawn_relay, sse_text_event};

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Application state shared across handlers.
pub struct AppState {
    pub chat: Arc<dyn ChatModel>,
    pub embedding: Arc<dyn EmbeddingModel>,
    pub prompts: PromptBuilder,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        embedding: Arc<dyn EmbeddingModel>,
        prompts: PromptBuilder,
    ) -> Self {
        Self {
            chat,
            embedding,
            prompts,
            start_time: Instant::now(),
        }
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/text", get(text))
        .route("/api/v1/text/stream", get(text_stream))
        .route("/api/v1/embedding", get(embedding))
        .route("/hi", get(hi))
        .route("/hi/stream", get(hi_stream))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// Model output for one response or one streamed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
}

impl ChatAnswer {
    pub fn of(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
        }
    }
}

impl From<&ChatResponse> for ChatAnswer {
    fn from(response: &ChatResponse) -> Self {
        Self::of(response.content())
    }
}

#[derive(Debug, Deserialize)]
pub struct QuestionParams {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct GreetingParams {
    #[serde(default)]
    pub input: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingParams {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn text(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QuestionParams>,
) -> Result<Json<ChatAnswer>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    info!(request_id, question_chars = params.question.chars().count(), "Text request");

    let prompt = state.prompts.build(&params.question)?;
    let response = state.chat.call(&prompt).await?;
    Ok(Json(ChatAnswer::from(&response)))
}

async fn text_stream(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QuestionParams>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    info!(request_id, question_chars = params.question.chars().count(), "Text stream request");

    let prompt = state.prompts.build(&params.question)?;
    let upstream = open_stream(state.chat.clone(), prompt);
    let body = Body::from_stream(spawn_relay(upstream, ndjson_line, request_id));

    Ok(([(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)], body).into_response())
}

async fn embedding(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EmbeddingParams>,
) -> Result<Json<Embedding>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    info!(request_id, text_chars = params.text.chars().count(), "Embedding request");

    let response = state.embedding.embed_for_response(&[params.text]).await?;
    let embedding = response.result().ok_or(ApiError::EmptyEmbedding)?;
    Ok(Json(embedding.clone()))
}

async fn hi(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GreetingParams>,
) -> Result<String, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    info!(request_id, "Greeting request");

    let response = state.chat.call(&greeting_prompt(params.input)).await?;
    Ok(response.content().to_string())
}

async fn hi_stream(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GreetingParams>,
) -> impl IntoResponse {
    let request_id = Uuid::new_v4().to_string();
    info!(request_id, "Greeting stream request");

    let upstream = open_stream(state.chat.clone(), greeting_prompt(params.input));
    Sse::new(spawn_relay(upstream, sse_text_event, request_id)).keep_alive(KeepAlive::default())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "route not found".to_string(),
        }),
    )
        .into_response()
}

/// The fixed "say hi" prompt, or the caller's input in its place.
fn greeting_prompt(input: Option<String>) -> Prompt {
    let message = match input {
        Some(input) if !input.trim().is_empty() => Message::user(input),
        _ => Message::system("say hi"),
    };
    Prompt::new(vec![message]).with_options(ChatOptions {
        model: Some("google/flan-ul2".to_string()),
        decoding_method: Some("sample".to_string()),
        random_seed: Some(1),
        ..Default::default()
    })
}

/// Open the model stream lazily, inside the relay, so a failure to start
/// counts as an upstream error after zero chunks.
fn open_stream(
    chat: Arc<dyn ChatModel>,
    prompt: Prompt,
) -> impl Stream<Item = Result<ChatResponse, ModelError>> + Send + 'static {
    stream::once(async move { chat.stream(&prompt).await }).try_flatten()
}
