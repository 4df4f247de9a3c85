//! Shared LLM service for the application.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Builds the provider client once from its config.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::{LlmService, TextGenerator};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let svc = Arc::new(LlmService::from_env()?);
//! let answer = svc.generate("Which states grow the most rice?").await?;
//! println!("{}: {answer}", svc.model_label());
//! # Ok(()) }
//! ```

use async_trait::async_trait;

use crate::{
    config::{
        default_config::config_from_env, llm_model_config::LlmModelConfig,
        llm_provider::LlmProvider,
    },
    error_handler::AiLlmError,
    generator::{FragmentStream, TextGenerator},
    health_service::{HealthService, HealthStatus},
    services::{gemini_service::GeminiService, ollama_service::OllamaService},
};

/// Timeout for health probes, in seconds.
const HEALTH_TIMEOUT_SECS: u64 = 10;

enum ProviderClient {
    Gemini(GeminiService),
    Ollama(OllamaService),
}

/// One configured model plus its client and health checker.
pub struct LlmService {
    cfg: LlmModelConfig,
    client: ProviderClient,
    health: HealthService,
}

impl LlmService {
    /// Creates a service for `cfg`, validating it by building the client.
    ///
    /// # Errors
    /// Returns [`AiLlmError`] if the provider client or health client cannot be built.
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let client = match cfg.provider {
            LlmProvider::Gemini => ProviderClient::Gemini(GeminiService::new(cfg.clone())?),
            LlmProvider::Ollama => ProviderClient::Ollama(OllamaService::new(cfg.clone())?),
        };

        Ok(Self {
            cfg,
            client,
            health: HealthService::new(Some(HEALTH_TIMEOUT_SECS))?,
        })
    }

    /// Loads the config selected by `LLM_KIND` and builds the service.
    ///
    /// # Errors
    /// Config errors (missing key, invalid numbers) and client build errors.
    pub fn from_env() -> Result<Self, AiLlmError> {
        Self::new(config_from_env()?)
    }

    /// The active model configuration.
    pub fn config(&self) -> &LlmModelConfig {
        &self.cfg
    }

    /// Probes the backend. Never fails; problems are reported in the status.
    pub async fn health(&self) -> HealthStatus {
        self.health.check(&self.cfg).await
    }
}

#[async_trait]
impl TextGenerator for LlmService {
    fn model_label(&self) -> String {
        self.cfg.display_name()
    }

    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream, AiLlmError> {
        match &self.client {
            ProviderClient::Gemini(cli) => cli.generate_stream(prompt).await,
            ProviderClient::Ollama(cli) => cli.generate_stream(prompt).await,
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiLlmError> {
        match &self.client {
            ProviderClient::Gemini(cli) => cli.generate(prompt).await,
            ProviderClient::Ollama(cli) => cli.generate(prompt).await,
        }
    }
}
