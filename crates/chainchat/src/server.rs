//! HTTP chat API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/chat` | Buffered chat completion |
//! | `POST` | `/api/chat/stream` | Streamed chat completion (SSE fragments) |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Both chat endpoints accept `{ "messages": [{ "role", "content" }, ...] }`
//! where the last turn is the active user query. The buffered endpoint
//! responds with `{ "content": "..." }`; the streaming endpoint responds
//! with a `text/event-stream` of `data:` fragments terminated by
//! `data: [DONE]`.
//!
//! # Error Contract
//!
//! Failures produce `{ "error": "<message>" }` with a failure status.
//! Model invocation errors are reported with a generic message; full
//! detail is logged to stderr.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted — the browser chat
//! client is served separately.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use chainchat_core::models::{Message, Role};
use chainchat_core::prompt;

use crate::config::Config;
use crate::invoker::ChatClient;
use crate::retriever::ContextRetriever;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    retriever: Arc<ContextRetriever>,
    chat: Arc<ChatClient>,
}

/// Start the chat HTTP server.
///
/// Binds to the address configured in `[server].bind` and runs until the
/// process is terminated. Fails at startup if the model client cannot be
/// constructed (missing API key).
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config.clone());

    let state = AppState {
        retriever: Arc::new(ContextRetriever::new(config.clone())),
        chat: Arc::new(ChatClient::from_env(&config.model)?),
        config,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/api/chat/stream", post(handle_chat_stream))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("ChainChat server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

/// Logs the full invocation failure and returns the generic user-visible
/// error for it.
fn invocation_error(err: anyhow::Error) -> AppError {
    eprintln!("Model invocation failed: {:#}", err);
    AppError {
        status: StatusCode::BAD_GATEWAY,
        message: "The assistant is currently unavailable. Please try again.".to_string(),
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
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

// ============ POST /api/chat ============

/// Request body shared by both chat endpoints.
#[derive(Deserialize)]
struct ChatRequest {
    messages: Vec<Message>,
}

/// JSON response body for the buffered endpoint.
#[derive(Serialize)]
struct ChatResponse {
    content: String,
}

/// Split the request into history and the active user query, then build
/// the full turn sequence with retrieved context injected.
async fn assemble_turns(state: &AppState, req: &ChatRequest) -> Result<Vec<Message>, AppError> {
    let last = req
        .messages
        .last()
        .ok_or_else(|| bad_request("messages must not be empty"))?;
    if last.role != Role::User {
        return Err(bad_request("the last turn must be a user message"));
    }

    let query = &last.content;
    let history = &req.messages[..req.messages.len() - 1];

    let ranked = state.retriever.retrieve(query, None).await;

    Ok(prompt::assemble(
        &state.config.persona.text,
        &ranked,
        history,
        query,
        state.config.persona.context_placement,
    ))
}

/// Handler for `POST /api/chat` — buffered completion.
async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let turns = assemble_turns(&state, &req).await?;

    let content = state
        .chat
        .complete(&turns)
        .await
        .map_err(invocation_error)?;

    Ok(Json(ChatResponse { content }))
}

/// Handler for `POST /api/chat/stream` — streamed completion.
///
/// Fragments are forwarded as SSE `data:` events carrying
/// `{ "content": "<fragment>" }`, terminated by `data: [DONE]`. If the
/// client disconnects, dropping the body drops the upstream response and
/// releases the connection.
async fn handle_chat_stream(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, AppError> {
    let turns = assemble_turns(&state, &req).await?;

    let fragments = state
        .chat
        .stream(&turns)
        .await
        .map_err(invocation_error)?;

    let events = fragments
        .map(|item| match item {
            Ok(fragment) => {
                let payload = serde_json::json!({ "content": fragment });
                Ok(format!("data: {}\n\n", payload))
            }
            Err(e) => {
                eprintln!("Model stream failed mid-flight: {:#}", e);
                Err(axum::Error::new(e))
            }
        })
        .chain(futures::stream::once(async {
            Ok("data: [DONE]\n\n".to_string())
        }));

    let response = (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(events),
    )
        .into_response();

    Ok(response)
}
