//! Reference data endpoints.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::Response};
use open_data::DatasetsPayload;
use qa_core::SAMPLE_QUESTIONS;
use serde::Serialize;

use crate::core::{app_state::AppState, http::response_envelope::ApiResponse};

/// Handler: GET /datasets
///
/// Live portal JSON when reachable, otherwise a fallback listing sample
/// topics. Always 200.
pub async fn datasets(State(state): State<Arc<AppState>>) -> Json<DatasetsPayload> {
    Json(state.open_data.fetch_datasets().await)
}

#[derive(Debug, Serialize)]
pub struct SampleQuestions {
    pub questions: &'static [&'static str],
}

/// Handler: GET /sample_questions
pub async fn sample_questions() -> Response {
    ApiResponse::success(SampleQuestions {
        questions: SAMPLE_QUESTIONS,
    })
    .into_response_with_status(StatusCode::OK)
}
