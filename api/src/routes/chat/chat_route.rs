//! POST /chat: one-shot question answering.

use std::sync::Arc;

use axum::{Json, extract::State};
use qa_core::{QaAnswer, ask};
use tracing::instrument;

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::chat::chat_request::{ChatRequest, ChatResponse},
};

/// Handler: POST /chat
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/chat \
///   -H 'content-type: application/json' \
///   -d '{"question":"Which states produce the most rice?"}'
/// ```
#[instrument(name = "chat_route", skip_all)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    if body.question.trim().is_empty() {
        return Err(AppError::BadRequest("question must not be empty".into()));
    }
    let generator = state
        .generator
        .as_deref()
        .ok_or(AppError::ModelNotConfigured)?;

    let QaAnswer { answer, sources } =
        ask(generator, &body.question, state.qa.citations()).await?;

    Ok(Json(ChatResponse { answer, sources }))
}
