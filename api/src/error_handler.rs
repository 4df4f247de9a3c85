use ai_llm_service::AiLlmError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use open_data::OpenDataError;
use qa_core::{QaError, SessionError};
use serde::Serialize;
use thiserror::Error;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("model configuration error: {0}")]
    LlmConfig(#[source] AiLlmError),

    #[error(transparent)]
    OpenData(#[from] OpenDataError),

    // --- IO / network / server ---
    #[error("failed to bind listener on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    SessionBusy(SessionError),

    #[error("model not configured: set GEMINI_API_KEY")]
    ModelNotConfigured,

    /// The model call failed; message is passed through to the client.
    #[error("{0}")]
    Model(AiLlmError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            // startup-only
            AppError::LlmConfig(_) | AppError::OpenData(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Bind { .. } | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 4xx
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SessionBusy(_) => StatusCode::CONFLICT,

            // 5xx
            AppError::ModelNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::LlmConfig(_) | AppError::OpenData(_) => "CONFIG_ERROR",
            AppError::Bind { .. } => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::SessionBusy(_) => "SESSION_BUSY",
            AppError::ModelNotConfigured => "MODEL_NOT_CONFIGURED",
            AppError::Model(_) => "MODEL_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.error_code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::EmptyInput => AppError::BadRequest(err.to_string()),
            // Handlers only submit; settling a turn happens off the request path.
            _ => AppError::SessionBusy(err),
        }
    }
}

impl From<QaError> for AppError {
    fn from(err: QaError) -> Self {
        match err {
            QaError::EmptyQuestion => AppError::BadRequest(err.to_string()),
            QaError::Llm(e) => AppError::Model(e),
        }
    }
}
