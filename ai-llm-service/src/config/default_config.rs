//! Default LLM configs loaded from environment variables.
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`         = provider kind (`gemini` default, or `ollama`)
//! - `LLM_MAX_TOKENS`   = optional max output tokens (u32)
//! - `LLM_TEMPERATURE`  = optional sampling temperature (`0.0..=2.0`)
//! - `LLM_TIMEOUT_SECS` = request timeout, default 120
//!
//! Gemini-specific:
//! - `GEMINI_API_KEY`  = API key (mandatory)
//! - `GEMINI_MODEL`    = model id, default `gemini-2.5-flash`
//! - `GEMINI_ENDPOINT` = API base, default `https://generativelanguage.googleapis.com`
//!
//! Ollama-specific:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//! - `OLLAMA_MODEL`                = model (mandatory)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt_f32, env_opt_u32, env_opt_u64, must_env, opt_env,
        validate_http_endpoint, validate_range_f32,
    },
};

/// Public Gemini REST base.
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Display name of [`DEFAULT_GEMINI_MODEL`], reported when no model could be configured.
pub const DEFAULT_GEMINI_LABEL: &str = "Google Gemini 2.5 Flash";

/// Request timeout used when `LLM_TIMEOUT_SECS` is not set.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Builds the model config selected by `LLM_KIND`.
///
/// # Errors
/// - [`ConfigError::UnsupportedProvider`] for an unknown `LLM_KIND`
/// - any error from [`config_gemini`] / [`config_ollama`]
pub fn config_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider = match opt_env("LLM_KIND") {
        Some(kind) => kind.parse::<LlmProvider>()?,
        None => LlmProvider::Gemini,
    };

    match provider {
        LlmProvider::Gemini => config_gemini(),
        LlmProvider::Ollama => config_ollama(),
    }
}

/// Constructs the Gemini config.
///
/// # Errors
/// - [`ConfigError::MissingVar`] if `GEMINI_API_KEY` is absent
/// - [`ConfigError::InvalidFormat`] if `GEMINI_ENDPOINT` is not http(s)
/// - number/range errors from the common knobs
pub fn config_gemini() -> Result<LlmModelConfig, AiLlmError> {
    let api_key = must_env("GEMINI_API_KEY")?;
    let model = opt_env("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
    let endpoint =
        opt_env("GEMINI_ENDPOINT").unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string());
    validate_http_endpoint("GEMINI_ENDPOINT", &endpoint)?;

    let knobs = GenerationKnobs::from_env()?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Gemini,
        model,
        endpoint,
        api_key: Some(api_key),
        max_tokens: knobs.max_tokens,
        temperature: knobs.temperature,
        top_p: None,
        timeout_secs: Some(knobs.timeout_secs),
    })
}

/// Constructs the Ollama config.
///
/// # Errors
/// - [`ConfigError::MissingVar`] if the endpoint or `OLLAMA_MODEL` is missing
/// - [`ConfigError::InvalidNumber`] if `OLLAMA_PORT` is invalid
pub fn config_ollama() -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = ollama_endpoint()?;
    let model = must_env("OLLAMA_MODEL")?;
    let knobs = GenerationKnobs::from_env()?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint,
        api_key: None,
        max_tokens: knobs.max_tokens,
        temperature: knobs.temperature,
        top_p: None,
        timeout_secs: Some(knobs.timeout_secs),
    })
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = opt_env("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = opt_env("OLLAMA_PORT") {
        port.parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

/// Provider-independent generation settings.
struct GenerationKnobs {
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout_secs: u64,
}

impl GenerationKnobs {
    fn from_env() -> Result<Self, AiLlmError> {
        let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?;
        let temperature = env_opt_f32("LLM_TEMPERATURE")?;
        if let Some(t) = temperature {
            validate_range_f32("temperature", t, 0.0, 2.0)?;
        }
        let timeout_secs = match env_opt_u64("LLM_TIMEOUT_SECS")? {
            Some(0) => {
                return Err(ConfigError::OutOfRange {
                    field: "LLM_TIMEOUT_SECS",
                    detail: "must be greater than zero",
                }
                .into());
            }
            Some(secs) => secs,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            max_tokens,
            temperature,
            timeout_secs,
        })
    }
}
