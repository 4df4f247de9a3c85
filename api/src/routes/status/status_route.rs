//! Liveness and model status.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
};

const SERVICE_NAME: &str = "Project Samarth - Q&A System for Indian Agricultural Data";

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub status: &'static str,
    pub ai_model: String,
    pub model_configured: bool,
}

/// Handler: GET /
pub async fn root(State(state): State<Arc<AppState>>) -> Json<RootResponse> {
    Json(RootResponse {
        message: SERVICE_NAME,
        status: "running",
        ai_model: state.ai_model.clone(),
        model_configured: state.model_configured(),
    })
}

/// Handler: GET /health
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "healthy" })))
}

/// Handler: GET /health/llm
///
/// Probes the model backend. Answers 503 when no model is configured or the
/// probe reports it unhealthy.
pub async fn llm_health(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let llm = state.llm.as_ref().ok_or(AppError::ModelNotConfigured)?;
    let status = llm.health().await;
    let code = if status.ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok((code, Json(status)))
}
