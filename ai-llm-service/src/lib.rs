//! Hosted LLM access for the Samarth Q&A backend.
//!
//! The crate exposes a single provider-agnostic seam, [`TextGenerator`], that
//! yields either one complete answer or an ordered [`FragmentStream`]. The
//! concrete [`LlmService`] routes to Google Gemini (default) or a local Ollama
//! runtime depending on [`LlmModelConfig::provider`].

pub mod config {
    pub mod default_config;
    pub mod llm_model_config;
    pub mod llm_provider;
}

pub mod services {
    pub mod gemini_service;
    pub mod ollama_service;
}

pub mod error_handler;
pub mod generator;
pub mod health_service;
pub mod llm_service;
pub mod telemetry;

pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::{AiLlmError, Result};
pub use generator::{FragmentStream, TextGenerator};
pub use health_service::{HealthService, HealthStatus};
pub use llm_service::LlmService;
