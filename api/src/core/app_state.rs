use std::sync::Arc;

use ai_llm_service::{
    LlmService, TextGenerator, config::default_config::DEFAULT_GEMINI_LABEL,
};
use open_data::{OpenDataClient, OpenDataConfig};
use qa_core::{QaConfig, SessionStore};
use tracing::{info, warn};

use crate::error_handler::{AppError, AppResult};

/// Shared state for all HTTP handlers.
pub struct AppState {
    /// Model used for answers. `None` when no API key was configured.
    pub generator: Option<Arc<dyn TextGenerator>>,
    /// Concrete service behind `generator`, kept for health probes.
    pub llm: Option<Arc<LlmService>>,
    /// Label reported by `GET /` and credited in answer sources.
    pub ai_model: String,
    pub open_data: OpenDataClient,
    pub sessions: SessionStore,
    pub qa: QaConfig,
}

impl AppState {
    /// Load shared state from environment variables.
    ///
    /// A missing `GEMINI_API_KEY` is not fatal: the server starts with the
    /// model disabled. Any other configuration error is.
    pub fn from_env() -> AppResult<Self> {
        let llm = match LlmService::from_env() {
            Ok(svc) => {
                info!(model = %svc.model_label(), "model configured");
                Some(Arc::new(svc))
            }
            Err(e) if e.is_missing_config() => {
                warn!(error = %e, "model disabled, chat endpoints will answer 503");
                None
            }
            Err(e) => return Err(AppError::LlmConfig(e)),
        };

        let open_data = OpenDataClient::new(OpenDataConfig::from_env()?)?;
        let mut state = Self::new(
            llm.clone().map(|svc| svc as Arc<dyn TextGenerator>),
            open_data,
            QaConfig::from_env(),
        );
        state.llm = llm;
        Ok(state)
    }

    /// State around an arbitrary generator, without a health-probed service.
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        open_data: OpenDataClient,
        qa: QaConfig,
    ) -> Self {
        let ai_model = generator
            .as_ref()
            .map(|g| g.model_label())
            .unwrap_or_else(|| DEFAULT_GEMINI_LABEL.to_string());
        Self {
            generator,
            llm: None,
            ai_model,
            open_data,
            sessions: SessionStore::with_idle_ttl(qa.session_ttl),
            qa,
        }
    }

    pub fn model_configured(&self) -> bool {
        self.generator.is_some()
    }
}
