//! HTTP request handlers

use super::types::{ChatRequest, ChatResponse, HealthResponse};
use super::AppState;
use crate::chat::NO_RESPONSE_REPLY;
use crate::llm::{LlmError, LlmRequest};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Body text of every failed chat request
pub const FAILURE_MESSAGE: &str = "Something went wrong!";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

// ============================================================
// Chat Completion
// ============================================================

async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let service = state.llm.as_ref().ok_or(AppError::NotConfigured)?;

    let request = LlmRequest::from_transcript(&req.messages);
    tracing::debug!(turns = request.messages.len(), model = %service.model_id(), "Forwarding chat");

    let response = service
        .complete(&request)
        .await
        .map_err(AppError::Upstream)?;

    tracing::debug!(
        finish_reason = response.finish_reason.as_deref().unwrap_or("none"),
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        "Chat completion done"
    );
    let text = response
        .text
        .unwrap_or_else(|| NO_RESPONSE_REPLY.to_string());
    Ok(Json(ChatResponse::ok(text)))
}

// ============================================================
// Error Handling
// ============================================================

/// Every failure answers 500 with the same body; the detail only goes to the log
#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotConfigured,
    Upstream(LlmError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::BadRequest(detail) => {
                tracing::warn!(detail = %detail, "Rejected malformed chat request");
            }
            AppError::NotConfigured => {
                tracing::error!("No LLM configured. Set OPENAI_API_KEY or LLM_GATEWAY.");
            }
            AppError::Upstream(err) => {
                tracing::error!(
                    kind = err.kind.as_str(),
                    status = ?err.status,
                    error = %err,
                    "Chat completion failed"
                );
            }
        }

        let body = Json(ChatResponse::failed(FAILURE_MESSAGE));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
